use conference::catalog::types::{Entity, Value, parse_time_of_day};
use conference::catalog::{EntityKey, EntityKind};
use conference::query::{RawFilter, SessionField, execute_two_inequality};
use conference::storage::EntityStore;
use conference::storage::memory::MemoryStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Row {
    duration: Option<i64>,
    start_minutes: Option<i64>,
}

fn row() -> impl Strategy<Value = Row> {
    (
        prop::option::weighted(0.85, 0..6i64),
        prop::option::weighted(0.85, 0..8i64),
    )
        .prop_map(|(duration, slot)| Row {
            duration: duration.map(|d| d * 15),
            start_minutes: slot.map(|s| 8 * 60 + s * 90),
        })
}

fn operator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["EQ", "NE", "GT", "GTEQ", "LT", "LTEQ"])
}

fn holds(op: &str, lhs: i64, rhs: i64) -> bool {
    match op {
        "EQ" => lhs == rhs,
        "NE" => lhs != rhs,
        "GT" => lhs > rhs,
        "GTEQ" => lhs >= rhs,
        "LT" => lhs < rhs,
        "LTEQ" => lhs <= rhs,
        other => panic!("unexpected operator {other}"),
    }
}

fn clock(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn session_entity(id: u64, row: &Row) -> Entity {
    let mut entity = Entity::new(EntityKey::root(EntityKind::Session, id))
        .with("name", Value::text(format!("session {id}")));
    if let Some(duration) = row.duration {
        entity = entity.with("duration", Value::Integer(duration));
    }
    if let Some(minutes) = row.start_minutes {
        let time = parse_time_of_day(&clock(minutes)).expect("valid clock");
        entity = entity.with("startTime", Value::Time(time));
    }
    entity
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A duration criterion runs in the store and a start-time criterion runs
    /// in memory; together they keep exactly the rows a direct scan keeps.
    #[test]
    fn post_filtered_results_match_a_direct_scan(
        rows in prop::collection::vec(row(), 0..24),
        duration_op in operator(),
        duration_bound in 0..6i64,
        time_op in operator(),
        time_slot in 0..8i64,
    ) {
        let store = MemoryStore::new();
        let entities: Vec<Entity> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| session_entity(idx as u64 + 1, row))
            .collect();
        if !entities.is_empty() {
            store.put_all(entities).expect("seed");
        }

        let duration_bound = duration_bound * 15;
        let time_bound = 8 * 60 + time_slot * 90;
        let criteria = [
            RawFilter::new("DURATION", duration_op, &duration_bound.to_string()),
            RawFilter::new("STARTTIME", time_op, &clock(time_bound)),
        ];
        let found: Vec<EntityKey> = execute_two_inequality::<SessionField>(&store, &criteria, None)
            .expect("query")
            .into_iter()
            .map(|entity| entity.key)
            .collect();

        let duration_sorts_first = duration_op != "EQ";
        let mut expected: Vec<(i64, i64, EntityKey)> = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let duration = row.duration?;
                let start = row.start_minutes?;
                (holds(duration_op, duration, duration_bound) && holds(time_op, start, time_bound))
                    .then(|| (duration, start, EntityKey::root(EntityKind::Session, idx as u64 + 1)))
            })
            .collect();
        if duration_sorts_first {
            expected.sort();
        } else {
            expected.sort_by(|a, b| (a.1, &a.2).cmp(&(b.1, &b.2)));
        }
        let expected: Vec<EntityKey> = expected.into_iter().map(|(_, _, key)| key).collect();
        prop_assert_eq!(found, expected);
    }
}

#[test]
fn fewer_than_two_criteria_is_invalid() {
    let store = MemoryStore::new();
    let err = execute_two_inequality::<SessionField>(
        &store,
        &[RawFilter::new("DURATION", "GT", "30")],
        None,
    )
    .expect_err("one criterion");
    assert_eq!(err.code_str(), "invalid_argument");
    assert!(err.to_string().contains("two filter conditions required"));
}

#[test]
fn the_held_back_criterion_may_use_a_second_inequality_field() {
    let store = MemoryStore::new();
    store
        .put_all(vec![
            session_entity(1, &Row { duration: Some(30), start_minutes: Some(9 * 60) }),
            session_entity(2, &Row { duration: Some(30), start_minutes: Some(20 * 60) }),
            session_entity(3, &Row { duration: Some(90), start_minutes: Some(10 * 60) }),
        ])
        .expect("seed");
    let found = execute_two_inequality::<SessionField>(
        &store,
        &[
            RawFilter::new("DURATION", "LT", "60"),
            RawFilter::new("STARTTIME", "LT", "19:00"),
        ],
        None,
    )
    .expect("query");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, EntityKey::root(EntityKind::Session, 1u64));
}
