use crate::catalog::types::Entity;
use crate::catalog::{EntityKey, EntityKind};
use crate::query::plan::{SortKey, StoreQuery};
use crate::storage::{
    ABSENT_VERSION, CommitRequest, EntityStore, EntityStream, StoreError, Versioned,
};
use im::OrdMap;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
struct StoredEntity {
    entity: Arc<Entity>,
    version: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    entities: OrdMap<EntityKey, StoredEntity>,
    commit_seq: u64,
    next_ids: HashMap<EntityKind, u64>,
}

/// In-process entity store over a persistent ordered map.
///
/// Readers clone the map under a short read lock and iterate the clone, so a
/// query never observes a partially applied commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sequence number of the most recent commit.
    pub fn commit_seq(&self) -> u64 {
        self.state.read().commit_seq
    }

    pub fn len(&self) -> usize {
        self.state.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> OrdMap<EntityKey, StoredEntity> {
        self.state.read().entities.clone()
    }
}

fn validate_query(query: &StoreQuery) -> Result<(), StoreError> {
    let inequalities = query.inequality_properties();
    if inequalities.len() > 1 {
        return Err(StoreError::InvalidQuery {
            reason: format!(
                "inequality filters on more than one property: {}",
                inequalities.join(", ")
            ),
        });
    }
    if let (Some(property), Some(first_sort)) = (inequalities.first(), query.order_by.first())
        && first_sort.property != *property
    {
        return Err(StoreError::InvalidQuery {
            reason: format!(
                "first sort property must be the inequality property '{property}', got '{}'",
                first_sort.property
            ),
        });
    }
    Ok(())
}

fn in_scope(query: &StoreQuery, entity: &Entity) -> bool {
    if entity.key.kind() != query.kind {
        return false;
    }
    match &query.ancestor {
        Some(ancestor) => *ancestor == entity.key || ancestor.is_ancestor_of(&entity.key),
        None => true,
    }
}

fn matches(query: &StoreQuery, entity: &Entity) -> bool {
    in_scope(query, entity)
        && query
            .filters
            .iter()
            .all(|filter| filter.op.evaluate(entity.get(&filter.property), &filter.value))
        && query
            .order_by
            .iter()
            .all(|sort| entity.stored(&sort.property).is_some())
}

fn compare_entities(order_by: &[SortKey], a: &Entity, b: &Entity) -> Ordering {
    for sort in order_by {
        // A stored null sorts ahead of every other value.
        let lhs = a.stored(&sort.property).and_then(|v| v.sort_key());
        let rhs = b.stored(&sort.property).and_then(|v| v.sort_key());
        let ord = lhs.cmp(&rhs);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.key.cmp(&b.key)
}

impl EntityStore for MemoryStore {
    fn get(&self, key: &EntityKey) -> Result<Option<Versioned>, StoreError> {
        let state = self.state.read();
        Ok(state.entities.get(key).map(|stored| Versioned {
            entity: (*stored.entity).clone(),
            version: stored.version,
        }))
    }

    fn query_with_filters(&self, query: &StoreQuery) -> Result<EntityStream, StoreError> {
        validate_query(query)?;
        let snapshot = self.snapshot();
        let filter_query = query.clone();
        let matching = snapshot
            .into_iter()
            .map(|(_, stored)| stored.entity)
            .filter(move |entity| matches(&filter_query, entity))
            .map(|entity| (*entity).clone());

        if query.order_by.is_empty() {
            // Key order, produced lazily off the snapshot.
            return Ok(EntityStream::new(matching));
        }
        let mut sorted: Vec<Entity> = matching.collect();
        sorted.sort_by(|a, b| compare_entities(&query.order_by, a, b));
        trace!(kind = %query.kind, results = sorted.len(), "sorted query");
        Ok(EntityStream::new(sorted))
    }

    fn allocate_id(
        &self,
        kind: EntityKind,
        parent: Option<&EntityKey>,
    ) -> Result<EntityKey, StoreError> {
        let mut state = self.state.write();
        let next = state.next_ids.entry(kind).or_insert(0);
        *next += 1;
        let id = *next;
        Ok(match parent {
            Some(parent) => parent.child(kind, id),
            None => EntityKey::root(kind, id),
        })
    }

    fn commit(&self, request: CommitRequest) -> Result<u64, StoreError> {
        let mut state = self.state.write();
        for assertion in &request.assertions {
            let actual = state
                .entities
                .get(&assertion.key)
                .map(|stored| stored.version)
                .unwrap_or(ABSENT_VERSION);
            if actual != assertion.expected_version {
                return Err(StoreError::Contention {
                    key: assertion.key.clone(),
                    expected: assertion.expected_version,
                    actual,
                });
            }
        }
        if request.writes.is_empty() {
            return Ok(state.commit_seq);
        }
        state.commit_seq += 1;
        let seq = state.commit_seq;
        for entity in request.writes {
            state.entities.insert(
                entity.key.clone(),
                StoredEntity {
                    entity: Arc::new(entity),
                    version: seq,
                },
            );
        }
        Ok(seq)
    }
}
