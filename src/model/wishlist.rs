use crate::catalog::types::{Entity, Value};
use crate::catalog::{EntityKey, EntityKind};
use crate::error::ConferenceError;
use crate::model::{expect_kind, key_list};

pub const SESSION_KEYS: &str = "sessionKeys";
const WISHLIST_ID: &str = "wishlist";

/// Per-profile set of sessions, kept in the profile's entity group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishList {
    pub key: EntityKey,
    pub session_keys: Vec<EntityKey>,
}

impl WishList {
    pub fn key_for(profile_key: &EntityKey) -> EntityKey {
        profile_key.child(EntityKind::WishList, WISHLIST_ID)
    }

    pub fn empty(profile_key: &EntityKey) -> Self {
        Self {
            key: Self::key_for(profile_key),
            session_keys: Vec::new(),
        }
    }

    pub fn contains(&self, session_key: &EntityKey) -> bool {
        self.session_keys.contains(session_key)
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone()).with(
            SESSION_KEYS,
            Value::List(self.session_keys.iter().cloned().map(Value::Key).collect()),
        )
    }

    pub fn from_entity(entity: &Entity) -> Result<Self, ConferenceError> {
        expect_kind(entity, EntityKind::WishList)?;
        Ok(Self {
            key: entity.key.clone(),
            session_keys: key_list(entity, SESSION_KEYS)?,
        })
    }
}
