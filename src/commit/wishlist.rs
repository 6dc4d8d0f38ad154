use crate::catalog::{EntityKey, EntityKind};
use crate::commit::tx::{TransactionScope, run_in_transaction};
use crate::config::RetryPolicy;
use crate::error::{ConferenceError, ResourceType};
use crate::identity::Identity;
use crate::model::{Session, WishList};
use crate::storage::EntityStore;
use tracing::info;

pub(crate) const ALREADY_IN_WISHLIST: &str = "session already in wish list";
pub(crate) const NOT_IN_WISHLIST: &str = "session not present in wish list";

/// Parses caller keys and checks each names a stored session, before any
/// transaction starts.
pub fn resolve_session_keys(
    store: &dyn EntityStore,
    websafe_keys: &[String],
) -> Result<Vec<EntityKey>, ConferenceError> {
    if websafe_keys.is_empty() {
        return Err(ConferenceError::invalid("at least one session key is required"));
    }
    let keys = websafe_keys
        .iter()
        .map(|websafe| EntityKey::parse_kind(websafe, EntityKind::Session))
        .collect::<Result<Vec<_>, _>>()?;
    let found = store.get_many(&keys)?;
    for (key, entity) in keys.iter().zip(&found) {
        if entity.is_none() {
            return Err(ConferenceError::not_found(
                ResourceType::Session,
                key.to_websafe(),
            ));
        }
    }
    Ok(keys)
}

/// Resolves keys to sessions in order. Sessions that no longer exist are
/// skipped.
pub fn load_sessions(
    store: &dyn EntityStore,
    keys: &[EntityKey],
) -> Result<Vec<Session>, ConferenceError> {
    store
        .get_many(keys)?
        .iter()
        .flatten()
        .map(Session::from_entity)
        .collect()
}

/// Adds every key or none. A key already listed, or repeated within the
/// request, is a conflict.
pub async fn add(
    store: &dyn EntityStore,
    retry: &RetryPolicy,
    identity: &Identity,
    websafe_keys: &[String],
) -> Result<Vec<Session>, ConferenceError> {
    let keys = resolve_session_keys(store, websafe_keys)?;
    let profile_key = identity.profile_key();
    let scope = TransactionScope::single(profile_key.clone());
    let list_key = WishList::key_for(&profile_key);
    let listed = run_in_transaction(store, &scope, retry, |tx| {
        let mut list = match tx.get(&list_key)? {
            Some(entity) => WishList::from_entity(&entity)?,
            None => WishList::empty(&profile_key),
        };
        for key in &keys {
            if list.contains(key) {
                return Err(ConferenceError::conflict(ALREADY_IN_WISHLIST));
            }
            list.session_keys.push(key.clone());
        }
        tx.put(list.to_entity())?;
        Ok(list.session_keys)
    })
    .await?;
    info!(user_id = %identity.user_id, added = keys.len(), "sessions added to wish list");
    load_sessions(store, &listed)
}

/// Removes every key or none. A key not listed is a conflict.
pub async fn remove(
    store: &dyn EntityStore,
    retry: &RetryPolicy,
    identity: &Identity,
    websafe_keys: &[String],
) -> Result<(), ConferenceError> {
    if websafe_keys.is_empty() {
        return Err(ConferenceError::invalid("at least one session key is required"));
    }
    let keys = websafe_keys
        .iter()
        .map(|websafe| EntityKey::parse_kind(websafe, EntityKind::Session))
        .collect::<Result<Vec<_>, _>>()?;
    let profile_key = identity.profile_key();
    let scope = TransactionScope::single(profile_key.clone());
    let list_key = WishList::key_for(&profile_key);
    run_in_transaction(store, &scope, retry, |tx| {
        let mut list = match tx.get(&list_key)? {
            Some(entity) => WishList::from_entity(&entity)?,
            None => WishList::empty(&profile_key),
        };
        for key in &keys {
            let Some(pos) = list.session_keys.iter().position(|listed| listed == key) else {
                return Err(ConferenceError::conflict(NOT_IN_WISHLIST));
            };
            list.session_keys.remove(pos);
        }
        tx.put(list.to_entity())
    })
    .await?;
    info!(user_id = %identity.user_id, removed = keys.len(), "sessions removed from wish list");
    Ok(())
}

/// Sessions on the caller's wish list; empty when none was ever created.
pub fn list(store: &dyn EntityStore, identity: &Identity) -> Result<Vec<Session>, ConferenceError> {
    let list_key = WishList::key_for(&identity.profile_key());
    let Some(found) = store.get(&list_key)? else {
        return Ok(Vec::new());
    };
    let list = WishList::from_entity(&found.entity)?;
    load_sessions(store, &list.session_keys)
}
