use crate::catalog::EntityKey;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
    Date,
    Time,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Text => write!(f, "text"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Date => write!(f, "date"),
            ValueType::Time => write!(f, "time"),
        }
    }
}

impl ValueType {
    /// Parses caller-supplied text into a typed value; `None` when the text
    /// does not fit the type.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            ValueType::Text => Some(Value::Text(raw.to_string())),
            ValueType::Integer => raw.trim().parse::<i64>().ok().map(Value::Integer),
            ValueType::Date => parse_date(raw).map(Value::Date),
            ValueType::Time => parse_time_of_day(raw).map(Value::Time),
        }
    }
}

/// The fixed date every time-of-day value is anchored to.
pub fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Accepts `YYYY-MM-DD`; anything after the first ten characters (such as a
/// time component) is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Accepts `HH:MM` or `HH:MM:SS` and anchors it at [`epoch_date`].
pub fn parse_time_of_day(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()?;
    Some(epoch_date().and_time(time))
}

pub fn format_time_of_day(value: &NaiveDateTime) -> String {
    value.format("%H:%M").to_string()
}

/// A single property value as held by the entity store.
///
/// Values of different kinds never compare equal; ordering across kinds
/// follows a fixed kind rank so mixed-kind sorts stay total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Date(NaiveDate),
    /// Time of day, anchored at 1970-01-01.
    Time(NaiveDateTime),
    Text(String),
    Key(EntityKey),
    List(Vec<Value>),
}

impl Value {
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Date(_) => 3,
            Value::Time(_) => 4,
            Value::Text(_) => 5,
            Value::Key(_) => 6,
            Value::List(_) => 7,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Scalars yield themselves; lists yield their elements.
    pub fn elements(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Sort representative: lists sort by their smallest element.
    pub fn sort_key(&self) -> Option<&Value> {
        match self {
            Value::List(items) => items.iter().min(),
            other => Some(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Key(a), Value::Key(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// A keyed bag of named properties, the unit the entity store reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, property: &str, value: Value) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &str, value: Value) {
        self.properties.insert(property.to_string(), value);
    }

    /// Null and absent are the same thing to filters.
    pub fn get(&self, property: &str) -> Option<&Value> {
        match self.properties.get(property) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// The stored value, null included. Only never-written properties are
    /// `None`.
    pub fn stored(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }
}
