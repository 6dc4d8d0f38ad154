//! Seat registration: links a profile to a conference and moves one seat,
//! both in a single transaction over the attendee's and organizer's groups.

use crate::catalog::EntityKey;
use crate::commit::tx::{Transaction, TransactionScope, run_in_transaction};
use crate::config::RetryPolicy;
use crate::error::{ConferenceError, ResourceType};
use crate::identity::Identity;
use crate::model::{Conference, Profile};
use crate::storage::EntityStore;
use tracing::info;

pub(crate) const ALREADY_REGISTERED: &str = "already registered";
pub(crate) const NO_SEATS_AVAILABLE: &str = "no seats available";

fn load_conference(
    tx: &mut Transaction<'_>,
    conference_key: &EntityKey,
) -> Result<Conference, ConferenceError> {
    let entity = tx.get(conference_key)?.ok_or_else(|| {
        ConferenceError::not_found(ResourceType::Conference, conference_key.to_websafe())
    })?;
    Conference::from_entity(&entity)
}

/// Fetches the caller's profile, creating it in memory when absent. The
/// absent read is still recorded, so a concurrent creation is detected.
pub(crate) fn load_or_create_profile(
    tx: &mut Transaction<'_>,
    identity: &Identity,
) -> Result<Profile, ConferenceError> {
    match tx.get(&identity.profile_key())? {
        Some(entity) => Profile::from_entity(&entity),
        None => Ok(Profile::new_for(identity)),
    }
}

fn registration_scope(identity: &Identity, conference_key: &EntityKey) -> TransactionScope {
    TransactionScope::cross_group([identity.profile_key(), conference_key.group()])
}

/// Takes a seat for `identity`. Fails with `Conflict` when already registered
/// or sold out; on success both entities are written together.
pub async fn register(
    store: &dyn EntityStore,
    retry: &RetryPolicy,
    identity: &Identity,
    conference_key: &EntityKey,
) -> Result<bool, ConferenceError> {
    let scope = registration_scope(identity, conference_key);
    let seats_left = run_in_transaction(store, &scope, retry, |tx| {
        let mut conference = load_conference(tx, conference_key)?;
        let mut profile = load_or_create_profile(tx, identity)?;
        if profile.attends(conference_key) {
            return Err(ConferenceError::conflict(ALREADY_REGISTERED));
        }
        if conference.seats_available <= 0 {
            return Err(ConferenceError::conflict(NO_SEATS_AVAILABLE));
        }
        profile.add_attendance(conference_key);
        conference.seats_available -= 1;
        tx.put(profile.to_entity())?;
        tx.put(conference.to_entity())?;
        Ok(conference.seats_available)
    })
    .await?;
    info!(
        user_id = %identity.user_id,
        conference = %conference_key,
        seats_left,
        "registered for conference"
    );
    Ok(true)
}

/// Gives the seat back. Unregistering a non-member returns `false` and
/// writes nothing. A conference already at full capacity while still listing
/// the caller is inconsistent and fails with `Decode`.
pub async fn unregister(
    store: &dyn EntityStore,
    retry: &RetryPolicy,
    identity: &Identity,
    conference_key: &EntityKey,
) -> Result<bool, ConferenceError> {
    let scope = registration_scope(identity, conference_key);
    let removed = run_in_transaction(store, &scope, retry, |tx| {
        let mut conference = load_conference(tx, conference_key)?;
        let mut profile = load_or_create_profile(tx, identity)?;
        if !profile.remove_attendance(conference_key) {
            return Ok(false);
        }
        if conference.seats_available >= conference.max_attendees {
            return Err(ConferenceError::Decode(format!(
                "conference {conference_key} has {} free seats of {} with an attendee still listed",
                conference.seats_available, conference.max_attendees
            )));
        }
        conference.seats_available += 1;
        tx.put(profile.to_entity())?;
        tx.put(conference.to_entity())?;
        Ok(true)
    })
    .await?;
    if removed {
        info!(
            user_id = %identity.user_id,
            conference = %conference_key,
            "unregistered from conference"
        );
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::{register, unregister};
    use crate::catalog::{EntityKey, EntityKind};
    use crate::config::{ConferenceConfig, RetryPolicy};
    use crate::identity::Identity;
    use crate::model::{Conference, ConferenceForm, Profile};
    use crate::storage::EntityStore;
    use crate::storage::memory::MemoryStore;

    fn seed(store: &MemoryStore, seats: i64) -> EntityKey {
        let key = EntityKey::root(EntityKind::Profile, "org").child(EntityKind::Conference, 1u64);
        let form = ConferenceForm {
            name: Some("RustConf".into()),
            max_attendees: Some(seats),
            ..ConferenceForm::default()
        };
        let conf = Conference::from_form(key.clone(), &form, "org", &ConferenceConfig::default())
            .expect("form");
        store.put_all(vec![conf.to_entity()]).expect("seed");
        key
    }

    fn seats(store: &MemoryStore, key: &EntityKey) -> i64 {
        let entity = store.get(key).expect("get").expect("present").entity;
        Conference::from_entity(&entity).expect("decode").seats_available
    }

    #[tokio::test]
    async fn register_then_unregister_moves_one_seat() {
        let store = MemoryStore::new();
        let conf = seed(&store, 2);
        let ada = Identity::new("ada", "ada@example.com", "Ada");
        let retry = RetryPolicy::default();

        assert!(register(&store, &retry, &ada, &conf).await.expect("register"));
        assert_eq!(seats(&store, &conf), 1);
        let profile = store
            .get(&ada.profile_key())
            .expect("get")
            .expect("created lazily")
            .entity;
        assert!(Profile::from_entity(&profile).expect("decode").attends(&conf));

        assert!(unregister(&store, &retry, &ada, &conf).await.expect("unregister"));
        assert_eq!(seats(&store, &conf), 2);
    }

    #[tokio::test]
    async fn unregister_non_member_writes_nothing() {
        let store = MemoryStore::new();
        let conf = seed(&store, 2);
        let before = store.commit_seq();
        let bob = Identity::new("bob", "bob@example.com", "Bob");
        let removed = unregister(&store, &RetryPolicy::default(), &bob, &conf)
            .await
            .expect("unregister");
        assert!(!removed);
        assert_eq!(seats(&store, &conf), 2);
        assert!(store.get(&bob.profile_key()).expect("get").is_none());
        assert_eq!(store.commit_seq(), before);
    }

    #[tokio::test]
    async fn unregister_rejects_a_seat_count_already_at_capacity() {
        let store = MemoryStore::new();
        let conf = seed(&store, 2);
        let ada = Identity::new("ada", "ada@example.com", "Ada");
        let mut profile = Profile::new_for(&ada);
        profile.add_attendance(&conf);
        store.put_all(vec![profile.to_entity()]).expect("listed without a seat taken");
        let before = store.commit_seq();

        let err = unregister(&store, &RetryPolicy::default(), &ada, &conf)
            .await
            .expect_err("seat count would pass capacity");
        assert_eq!(err.code_str(), "decode");
        assert_eq!(seats(&store, &conf), 2);
        assert_eq!(store.commit_seq(), before);
    }

    #[tokio::test]
    async fn missing_conference_is_not_found() {
        let store = MemoryStore::new();
        let ghost = EntityKey::root(EntityKind::Profile, "org").child(EntityKind::Conference, 77u64);
        let ada = Identity::new("ada", "ada@example.com", "Ada");
        let err = register(&store, &RetryPolicy::default(), &ada, &ghost)
            .await
            .expect_err("missing");
        assert_eq!(err.code_str(), "conference_not_found");
    }
}
