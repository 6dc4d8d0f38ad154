//! In-memory evaluation of a second inequality criterion.
//!
//! The store rejects inequalities on two properties, so one criterion is held
//! back from the store query and applied to its results here. The outcome is
//! exact as a set; ordering follows the primary query only.

use crate::catalog::EntityKey;
use crate::catalog::types::Entity;
use crate::error::ConferenceError;
use crate::query::compile::CompiledFilter;
use crate::query::executor::execute_query;
use crate::query::fields::FilterField;
use crate::query::plan::RawFilter;
use crate::storage::EntityStore;
use tracing::debug;

pub(crate) const TWO_CONDITIONS_REQUIRED: &str = "two filter conditions required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryFilter<F> {
    filter: CompiledFilter<F>,
}

impl<F: FilterField> SecondaryFilter<F> {
    pub fn compile(raw: &RawFilter) -> Result<Self, ConferenceError> {
        Ok(Self {
            filter: CompiledFilter::resolve(raw)?,
        })
    }

    pub fn field(&self) -> F {
        self.filter.field
    }

    /// Absent properties never match.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.filter
            .op
            .evaluate(entity.get(self.filter.field.property()), &self.filter.value)
    }

    /// Keeps matching entities in their incoming order.
    pub fn apply<I>(&self, entities: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = Entity>,
    {
        entities
            .into_iter()
            .filter(|entity| self.matches(entity))
            .collect()
    }
}

/// Splits off the criterion at index 1, leaving the rest in order.
pub fn split_secondary(raw: &[RawFilter]) -> Result<(Vec<RawFilter>, RawFilter), ConferenceError> {
    if raw.len() < 2 {
        return Err(ConferenceError::invalid(TWO_CONDITIONS_REQUIRED));
    }
    let secondary = raw[1].clone();
    let primary = raw
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != 1)
        .map(|(_, criterion)| criterion.clone())
        .collect();
    Ok((primary, secondary))
}

/// Runs every criterion except the second against the store, then applies
/// the second in memory.
pub fn execute_two_inequality<F: FilterField>(
    store: &dyn EntityStore,
    raw: &[RawFilter],
    ancestor: Option<&EntityKey>,
) -> Result<Vec<Entity>, ConferenceError> {
    let (primary, secondary) = split_secondary(raw)?;
    let secondary = SecondaryFilter::<F>::compile(&secondary)?;
    let mut stream = execute_query::<F>(store, &primary, ancestor)?;
    let kept = secondary.apply(stream.by_ref());
    debug!(
        secondary = secondary.field().property(),
        examined = stream.examined(),
        kept = kept.len(),
        "applied secondary filter"
    );
    Ok(kept)
}
