pub mod types;

use crate::error::ConferenceError;
use crate::storage::encoded_key::{decode_path, encode_path};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Profile,
    Conference,
    Session,
    WishList,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Profile => "Profile",
            EntityKind::Conference => "Conference",
            EntityKind::Session => "Session",
            EntityKind::WishList => "WishList",
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            EntityKind::Profile => 1,
            EntityKind::Conference => 2,
            EntityKind::Session => 3,
            EntityKind::WishList => 4,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EntityKind::Profile),
            2 => Some(EntityKind::Conference),
            3 => Some(EntityKind::Session),
            4 => Some(EntityKind::WishList),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    Int(u64),
    Name(String),
}

impl From<u64> for KeyId {
    fn from(value: u64) -> Self {
        KeyId::Int(value)
    }
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        KeyId::Name(value.to_string())
    }
}

impl From<String> for KeyId {
    fn from(value: String) -> Self {
        KeyId::Name(value)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyId::Int(id) => write!(f, "{id}"),
            KeyId::Name(name) => write!(f, "{name:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyPart {
    pub kind: EntityKind,
    pub id: KeyId,
}

/// Ancestor path identifying one entity. The first part is the entity group
/// root; every descendant sorts directly after its ancestor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    path: Vec<KeyPart>,
}

impl EntityKey {
    pub fn root(kind: EntityKind, id: impl Into<KeyId>) -> Self {
        Self {
            path: vec![KeyPart {
                kind,
                id: id.into(),
            }],
        }
    }

    pub fn child(&self, kind: EntityKind, id: impl Into<KeyId>) -> Self {
        let mut path = self.path.clone();
        path.push(KeyPart {
            kind,
            id: id.into(),
        });
        Self { path }
    }

    pub(crate) fn from_parts(path: Vec<KeyPart>) -> Option<Self> {
        if path.is_empty() {
            return None;
        }
        Some(Self { path })
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.path
    }

    fn last(&self) -> &KeyPart {
        // Constructors never produce an empty path.
        &self.path[self.path.len() - 1]
    }

    pub fn kind(&self) -> EntityKind {
        self.last().kind
    }

    pub fn id(&self) -> &KeyId {
        &self.last().id
    }

    pub fn parent(&self) -> Option<EntityKey> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Root of the entity group this key belongs to.
    pub fn group(&self) -> EntityKey {
        Self {
            path: vec![self.path[0].clone()],
        }
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &EntityKey) -> bool {
        other.path.len() > self.path.len() && other.path.starts_with(&self.path)
    }

    pub fn to_websafe(&self) -> String {
        hex::encode(encode_path(&self.path))
    }

    pub fn from_websafe(websafe: &str) -> Result<Self, ConferenceError> {
        let malformed = || ConferenceError::invalid(format!("malformed key '{websafe}'"));
        let bytes = hex::decode(websafe.trim()).map_err(|_| malformed())?;
        let path = decode_path(&bytes).ok_or_else(malformed)?;
        Self::from_parts(path).ok_or_else(malformed)
    }

    /// Parses a caller-supplied key and checks it names the expected kind.
    pub fn parse_kind(websafe: &str, kind: EntityKind) -> Result<Self, ConferenceError> {
        let key = Self::from_websafe(websafe)?;
        if key.kind() != kind {
            return Err(ConferenceError::invalid(format!(
                "key '{websafe}' names a {} where a {kind} was expected",
                key.kind()
            )));
        }
        Ok(key)
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, part) in self.path.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}({})", part.kind, part.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKey, EntityKind, KeyId};

    #[test]
    fn websafe_keys_roundtrip_through_hex() {
        let key = EntityKey::root(EntityKind::Profile, "ada@example.com")
            .child(EntityKind::Conference, 42u64)
            .child(EntityKind::Session, 7u64);
        let websafe = key.to_websafe();
        assert!(websafe.chars().all(|c| c.is_ascii_hexdigit()));
        let decoded = EntityKey::from_websafe(&websafe).expect("decode");
        assert_eq!(decoded, key);
        assert_eq!(decoded.kind(), EntityKind::Session);
        assert_eq!(decoded.id(), &KeyId::Int(7));
    }

    #[test]
    fn malformed_websafe_keys_are_invalid_arguments() {
        for input in ["", "zz", "01", "ff00"] {
            let err = EntityKey::from_websafe(input).expect_err("must reject");
            assert_eq!(err.code_str(), "invalid_argument", "input {input:?}");
        }
    }

    #[test]
    fn parse_kind_rejects_other_kinds() {
        let profile = EntityKey::root(EntityKind::Profile, "u1");
        let err = EntityKey::parse_kind(&profile.to_websafe(), EntityKind::Conference)
            .expect_err("profile is not a conference");
        assert_eq!(err.code_str(), "invalid_argument");
    }

    #[test]
    fn descendants_sort_between_ancestor_and_next_sibling() {
        let a = EntityKey::root(EntityKind::Profile, "a");
        let a_child = a.child(EntityKind::Conference, 1u64);
        let b = EntityKey::root(EntityKind::Profile, "b");
        assert!(a < a_child && a_child < b);
        assert!(a.is_ancestor_of(&a_child));
        assert!(!a.is_ancestor_of(&a));
        assert_eq!(a_child.group(), a);
        assert_eq!(a_child.parent(), Some(a));
    }
}
