use crate::catalog::{EntityKey, EntityKind};
use crate::error::ConferenceError;
use serde::{Deserialize, Serialize};

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: display_name.into(),
        }
    }

    /// Root key of the caller's entity group.
    pub fn profile_key(&self) -> EntityKey {
        EntityKey::root(EntityKind::Profile, self.user_id.as_str())
    }
}

/// Resolves the identity behind the current request, if any.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

/// Provider that always answers with the same identity.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

pub(crate) fn require(caller: Option<&Identity>) -> Result<&Identity, ConferenceError> {
    caller.ok_or(ConferenceError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::{Identity, IdentityProvider, StaticIdentity, require};
    use crate::catalog::EntityKind;

    #[test]
    fn anonymous_callers_are_unauthenticated() {
        let provider = StaticIdentity::anonymous();
        let caller = provider.current_identity();
        let err = require(caller.as_ref()).expect_err("no identity");
        assert_eq!(err.code_str(), "unauthenticated");
    }

    #[test]
    fn profile_key_is_a_group_root() {
        let ada = Identity::new("u-1", "ada@example.com", "Ada");
        let provider = StaticIdentity::signed_in(ada.clone());
        assert_eq!(provider.current_identity(), Some(ada.clone()));
        let key = ada.profile_key();
        assert_eq!(key.kind(), EntityKind::Profile);
        assert_eq!(key.group(), key);
    }
}
