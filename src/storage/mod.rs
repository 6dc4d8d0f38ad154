pub mod encoded_key;
pub mod memory;

use crate::catalog::types::Entity;
use crate::catalog::{EntityKey, EntityKind};
use crate::query::plan::StoreQuery;
use std::fmt;

/// Version of an entity that has never been written.
pub const ABSENT_VERSION: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub entity: Entity,
    /// Commit sequence that last wrote the entity.
    pub version: u64,
}

/// Commit precondition: `key` is still at `expected_version`
/// ([`ABSENT_VERSION`] when it was read as missing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAssertion {
    pub key: EntityKey,
    pub expected_version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    pub assertions: Vec<VersionAssertion>,
    pub writes: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The query breaks a datastore rule (inequality or ordering shape).
    InvalidQuery {
        reason: String,
    },
    /// A transaction touched a key outside its declared entity groups.
    OutsideScope {
        key: EntityKey,
    },
    /// A version assertion failed at commit time.
    Contention {
        key: EntityKey,
        expected: u64,
        actual: u64,
    },
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidQuery { reason } => write!(f, "invalid query: {reason}"),
            StoreError::OutsideScope { key } => {
                write!(f, "key {key} is outside the transaction scope")
            }
            StoreError::Contention {
                key,
                expected,
                actual,
            } => write!(
                f,
                "contention on {key}: expected version {expected}, found {actual}"
            ),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Lazy result sequence of a store query.
pub struct EntityStream {
    entities: Box<dyn Iterator<Item = Entity> + Send>,
    examined: usize,
}

impl EntityStream {
    pub fn new<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
        I::IntoIter: Iterator<Item = Entity> + Send + 'static,
    {
        Self {
            entities: Box::new(entities.into_iter()),
            examined: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Entities pulled from the stream so far.
    pub fn examined(&self) -> usize {
        self.examined
    }
}

impl Iterator for EntityStream {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let entity = self.entities.next()?;
        self.examined += 1;
        Some(entity)
    }
}

impl fmt::Debug for EntityStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStream")
            .field("examined", &self.examined)
            .finish_non_exhaustive()
    }
}

/// Persistent, ordered entity storage with entity-group transactions.
///
/// Queries may constrain at most one property with inequality operators, and
/// when they do, that property must lead the sort order.
pub trait EntityStore: Send + Sync {
    fn get(&self, key: &EntityKey) -> Result<Option<Versioned>, StoreError>;

    /// Results line up with `keys`; missing entities come back as `None`.
    fn get_many(&self, keys: &[EntityKey]) -> Result<Vec<Option<Entity>>, StoreError> {
        keys.iter()
            .map(|key| self.get(key).map(|found| found.map(|v| v.entity)))
            .collect()
    }

    /// Unconditional write of every entity in one commit.
    fn put_all(&self, entities: Vec<Entity>) -> Result<u64, StoreError> {
        self.commit(CommitRequest {
            assertions: Vec::new(),
            writes: entities,
        })
    }

    fn query_by_ancestor(
        &self,
        kind: EntityKind,
        ancestor: &EntityKey,
    ) -> Result<EntityStream, StoreError> {
        self.query_with_filters(&StoreQuery::kind(kind).ancestor(ancestor.clone()))
    }

    fn query_with_filters(&self, query: &StoreQuery) -> Result<EntityStream, StoreError>;

    /// Reserves a fresh integer id and returns the complete key.
    fn allocate_id(
        &self,
        kind: EntityKind,
        parent: Option<&EntityKey>,
    ) -> Result<EntityKey, StoreError>;

    /// Applies every write atomically if every assertion holds; otherwise
    /// fails with [`StoreError::Contention`] and writes nothing.
    fn commit(&self, request: CommitRequest) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::{EntityStream, StoreError};
    use crate::catalog::types::Entity;
    use crate::catalog::{EntityKey, EntityKind};

    #[test]
    fn stream_counts_pulled_entities() {
        let entities = (1..=3u64)
            .map(|id| Entity::new(EntityKey::root(EntityKind::Profile, id)))
            .collect::<Vec<_>>();
        let mut stream = EntityStream::new(entities);
        assert!(stream.next().is_some());
        assert_eq!(stream.examined(), 1);
        assert_eq!(stream.by_ref().count(), 2);
        assert_eq!(stream.examined(), 3);
        assert_eq!(EntityStream::empty().count(), 0);
    }

    #[test]
    fn store_error_display_is_human_readable() {
        let err = StoreError::Contention {
            key: EntityKey::root(EntityKind::Profile, "u1"),
            expected: 3,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "contention on Profile(\"u1\"): expected version 3, found 4"
        );
    }
}
