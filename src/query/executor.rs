use crate::catalog::EntityKey;
use crate::error::ConferenceError;
use crate::query::compile::{CompiledFilters, compile_filters};
use crate::query::fields::FilterField;
use crate::query::plan::{RawFilter, StoreQuery};
use crate::storage::{EntityStore, EntityStream};
use tracing::debug;

/// Builds the store query for compiled criteria.
///
/// The inequality property, when there is one, leads the ordering; the
/// kind's fixed secondary key always follows. All orderings are ascending.
pub fn plan_query<F: FilterField>(
    compiled: &CompiledFilters<F>,
    ancestor: Option<&EntityKey>,
) -> StoreQuery {
    let mut query = StoreQuery::kind(F::KIND);
    if let Some(ancestor) = ancestor {
        query = query.ancestor(ancestor.clone());
    }
    for filter in &compiled.filters {
        query.filters.push(filter.to_store_filter());
    }
    if let Some(field) = compiled.inequality_field {
        query = query.order_by(field.property());
    }
    if query
        .order_by
        .first()
        .is_none_or(|sort| sort.property != F::SECONDARY_SORT)
    {
        query = query.order_by(F::SECONDARY_SORT);
    }
    query
}

pub fn execute_compiled<F: FilterField>(
    store: &dyn EntityStore,
    compiled: &CompiledFilters<F>,
    ancestor: Option<&EntityKey>,
) -> Result<EntityStream, ConferenceError> {
    let query = plan_query(compiled, ancestor);
    debug!(
        kind = %query.kind,
        filters = query.filters.len(),
        inequality = ?compiled.inequality_field.map(|f| f.property()),
        "executing filtered query"
    );
    Ok(store.query_with_filters(&query)?)
}

/// Compiles `raw` for the field set `F` and runs it.
pub fn execute_query<F: FilterField>(
    store: &dyn EntityStore,
    raw: &[RawFilter],
    ancestor: Option<&EntityKey>,
) -> Result<EntityStream, ConferenceError> {
    let compiled = compile_filters::<F>(raw)?;
    execute_compiled(store, &compiled, ancestor)
}

#[cfg(test)]
mod tests {
    use super::plan_query;
    use crate::catalog::EntityKind;
    use crate::query::compile::compile_filters;
    use crate::query::fields::{ConferenceField, SessionField};
    use crate::query::plan::RawFilter;

    fn sort_properties(query: &crate::query::plan::StoreQuery) -> Vec<&str> {
        query.order_by.iter().map(|s| s.property.as_str()).collect()
    }

    #[test]
    fn inequality_field_leads_the_ordering() {
        let compiled = compile_filters::<ConferenceField>(&[
            RawFilter::new("CITY", "EQ", "London"),
            RawFilter::new("MONTH", "GT", "3"),
        ])
        .expect("compile");
        let query = plan_query(&compiled, None);
        assert_eq!(query.kind, EntityKind::Conference);
        assert_eq!(sort_properties(&query), vec!["month", "name"]);
        assert_eq!(query.filters.len(), 2);
    }

    #[test]
    fn equality_only_sorts_by_secondary_key() {
        let compiled = compile_filters::<SessionField>(&[RawFilter::new(
            "TYPEOFSESSION",
            "EQ",
            "Workshop",
        )])
        .expect("compile");
        assert_eq!(sort_properties(&plan_query(&compiled, None)), vec!["startTime"]);
    }

    #[test]
    fn secondary_key_is_not_repeated_when_it_is_the_inequality() {
        let compiled =
            compile_filters::<SessionField>(&[RawFilter::new("STARTTIME", "LT", "19:00")])
                .expect("compile");
        assert_eq!(sort_properties(&plan_query(&compiled, None)), vec!["startTime"]);
    }
}
