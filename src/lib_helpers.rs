use super::*;
use crate::catalog::types::Entity;
use crate::commit::Transaction;
use std::collections::HashMap;

pub(crate) fn parse_conference_key(websafe: &str) -> Result<EntityKey, ConferenceError> {
    EntityKey::parse_kind(websafe, EntityKind::Conference)
}

/// Loads the caller's profile, writing a fresh one when none exists yet.
pub(crate) fn ensure_profile(
    tx: &mut Transaction<'_>,
    identity: &Identity,
) -> Result<Profile, ConferenceError> {
    match tx.get(&identity.profile_key())? {
        Some(entity) => Profile::from_entity(&entity),
        None => {
            let profile = Profile::new_for(identity);
            tx.put(profile.to_entity())?;
            info!(user_id = %identity.user_id, "profile created");
            Ok(profile)
        }
    }
}

/// Display names of the organizers of `conferences`, keyed by profile key.
pub(crate) fn organizer_names(
    store: &dyn EntityStore,
    conferences: &[Conference],
) -> Result<HashMap<EntityKey, String>, ConferenceError> {
    let mut keys: Vec<EntityKey> = conferences.iter().map(|conf| conf.key.group()).collect();
    keys.sort();
    keys.dedup();
    let mut names = HashMap::with_capacity(keys.len());
    for entity in store.get_many(&keys)?.iter().flatten() {
        let profile = Profile::from_entity(entity)?;
        names.insert(profile.key, profile.display_name);
    }
    Ok(names)
}

pub(crate) fn session_views<I>(entities: I) -> Result<Vec<SessionView>, ConferenceError>
where
    I: IntoIterator<Item = Entity>,
{
    entities
        .into_iter()
        .map(|entity| Session::from_entity(&entity).map(|session| session.view()))
        .collect()
}

pub(crate) fn describe_conference(view: &ConferenceView) -> String {
    serde_json::to_string(view).unwrap_or_else(|_| view.name.clone())
}

pub(crate) fn announcement_text(nearly_sold_out: &[String]) -> String {
    if nearly_sold_out.is_empty() {
        return String::new();
    }
    format!(
        "Last chance to attend! The following conferences are nearly sold out: {}",
        nearly_sold_out.join(", ")
    )
}

/// Empty unless the speaker has more than one session.
pub(crate) fn featured_speaker_text(speaker: &str, session_names: &[String]) -> String {
    if session_names.len() < 2 {
        return String::new();
    }
    format!(
        "Featured speaker: {speaker}. Sessions: {}",
        session_names.join(", ")
    )
}
