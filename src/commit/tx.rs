use crate::catalog::EntityKey;
use crate::catalog::types::Entity;
use crate::config::RetryPolicy;
use crate::error::ConferenceError;
use crate::storage::{
    ABSENT_VERSION, CommitRequest, EntityStore, StoreError, VersionAssertion,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Entity groups a transaction may touch, named by their root keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionScope {
    groups: Vec<EntityKey>,
}

impl TransactionScope {
    pub fn single(group: EntityKey) -> Self {
        Self {
            groups: vec![group.group()],
        }
    }

    pub fn cross_group<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = EntityKey>,
    {
        let mut roots: Vec<EntityKey> = Vec::new();
        for key in groups {
            let root = key.group();
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Self { groups: roots }
    }

    pub fn groups(&self) -> &[EntityKey] {
        &self.groups
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        let root = key.group();
        self.groups.iter().any(|group| *group == root)
    }

    fn check(&self, key: &EntityKey) -> Result<(), StoreError> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(StoreError::OutsideScope { key: key.clone() })
        }
    }
}

/// Read set and buffered writes of one transaction attempt.
///
/// Every read records the version it observed; the commit asserts those
/// versions are still current. Writes are invisible to other transactions
/// until the commit applies them together.
pub struct Transaction<'a> {
    store: &'a dyn EntityStore,
    scope: &'a TransactionScope,
    reads: BTreeMap<EntityKey, u64>,
    writes: BTreeMap<EntityKey, Entity>,
}

impl<'a> Transaction<'a> {
    fn begin(store: &'a dyn EntityStore, scope: &'a TransactionScope) -> Self {
        Self {
            store,
            scope,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn get(&mut self, key: &EntityKey) -> Result<Option<Entity>, ConferenceError> {
        self.scope.check(key)?;
        if let Some(pending) = self.writes.get(key) {
            return Ok(Some(pending.clone()));
        }
        let found = self.store.get(key)?;
        let version = found.as_ref().map_or(ABSENT_VERSION, |v| v.version);
        // The first observation is the one the commit must still match.
        self.reads.entry(key.clone()).or_insert(version);
        Ok(found.map(|v| v.entity))
    }

    pub fn put(&mut self, entity: Entity) -> Result<(), ConferenceError> {
        self.scope.check(&entity.key)?;
        self.writes.insert(entity.key.clone(), entity);
        Ok(())
    }

    fn into_request(self) -> CommitRequest {
        CommitRequest {
            assertions: self
                .reads
                .into_iter()
                .map(|(key, expected_version)| VersionAssertion {
                    key,
                    expected_version,
                })
                .collect(),
            writes: self.writes.into_values().collect(),
        }
    }
}

/// Runs `body` inside an optimistic transaction over `scope`, retrying on
/// contention per `retry`.
///
/// The body may run several times and must not have side effects outside the
/// transaction. An error from the body aborts without retrying. A body that
/// writes nothing still validates its reads, so read-only callers observe a
/// consistent snapshot.
pub async fn run_in_transaction<T, F>(
    store: &dyn EntityStore,
    scope: &TransactionScope,
    retry: &RetryPolicy,
    mut body: F,
) -> Result<T, ConferenceError>
where
    F: FnMut(&mut Transaction<'_>) -> Result<T, ConferenceError>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let mut tx = Transaction::begin(store, scope);
        let value = body(&mut tx)?;
        let writes = tx.writes.len();
        match store.commit(tx.into_request()) {
            Ok(seq) => {
                debug!(seq, attempt, writes, "transaction committed");
                return Ok(value);
            }
            Err(StoreError::Contention { key, .. }) => {
                if attempt >= max_attempts {
                    warn!(%key, attempt, "transaction retries exhausted");
                    return Err(ConferenceError::Transient(format!(
                        "transaction on {key} did not commit after {attempt} attempts"
                    )));
                }
                let delay = retry.backoff(attempt);
                warn!(%key, attempt, delay_ms = delay.as_millis() as u64, "transaction contention, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other.into()),
        }
    }
}
