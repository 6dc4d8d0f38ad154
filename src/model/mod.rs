//! Typed entities, their explicit mapping to and from stored properties, and
//! the request/response shapes exposed by the API.

pub mod conference;
pub mod profile;
pub mod session;
pub mod wishlist;

pub use conference::{Conference, ConferenceForm, ConferenceUpdate, ConferenceView};
pub use profile::{Profile, ProfileMiniForm, ProfileView, TeeShirtSize};
pub use session::{Session, SessionForm, SessionView};
pub use wishlist::WishList;

use crate::catalog::EntityKey;
use crate::catalog::EntityKind;
use crate::catalog::types::{Entity, Value, parse_date};
use crate::error::ConferenceError;
use chrono::{NaiveDate, NaiveDateTime};

fn decode_error(entity: &Entity, property: &str, expected: &str) -> ConferenceError {
    ConferenceError::Decode(format!(
        "{}: property '{property}' is not {expected}",
        entity.key
    ))
}

pub(crate) fn expect_kind(entity: &Entity, kind: EntityKind) -> Result<(), ConferenceError> {
    if entity.key.kind() != kind {
        return Err(ConferenceError::Decode(format!(
            "{} is not a {kind}",
            entity.key
        )));
    }
    Ok(())
}

pub(crate) fn optional_text(
    entity: &Entity,
    property: &str,
) -> Result<Option<String>, ConferenceError> {
    match entity.get(property) {
        None => Ok(None),
        Some(Value::Text(text)) => Ok(Some(text.clone())),
        Some(_) => Err(decode_error(entity, property, "text")),
    }
}

pub(crate) fn required_text(entity: &Entity, property: &str) -> Result<String, ConferenceError> {
    optional_text(entity, property)?.ok_or_else(|| decode_error(entity, property, "present"))
}

pub(crate) fn optional_integer(
    entity: &Entity,
    property: &str,
) -> Result<Option<i64>, ConferenceError> {
    match entity.get(property) {
        None => Ok(None),
        Some(Value::Integer(value)) => Ok(Some(*value)),
        Some(_) => Err(decode_error(entity, property, "an integer")),
    }
}

pub(crate) fn required_integer(entity: &Entity, property: &str) -> Result<i64, ConferenceError> {
    optional_integer(entity, property)?.ok_or_else(|| decode_error(entity, property, "present"))
}

pub(crate) fn optional_date(
    entity: &Entity,
    property: &str,
) -> Result<Option<NaiveDate>, ConferenceError> {
    match entity.get(property) {
        None => Ok(None),
        Some(Value::Date(date)) => Ok(Some(*date)),
        Some(_) => Err(decode_error(entity, property, "a date")),
    }
}

pub(crate) fn optional_time(
    entity: &Entity,
    property: &str,
) -> Result<Option<NaiveDateTime>, ConferenceError> {
    match entity.get(property) {
        None => Ok(None),
        Some(Value::Time(time)) => Ok(Some(*time)),
        Some(_) => Err(decode_error(entity, property, "a time")),
    }
}

pub(crate) fn text_list(entity: &Entity, property: &str) -> Result<Vec<String>, ConferenceError> {
    let Some(value) = entity.get(property) else {
        return Ok(Vec::new());
    };
    value
        .elements()
        .iter()
        .map(|element| {
            element
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| decode_error(entity, property, "a list of text"))
        })
        .collect()
}

pub(crate) fn key_list(entity: &Entity, property: &str) -> Result<Vec<EntityKey>, ConferenceError> {
    let Some(value) = entity.get(property) else {
        return Ok(Vec::new());
    };
    value
        .elements()
        .iter()
        .map(|element| match element {
            Value::Key(key) => Ok(key.clone()),
            _ => Err(decode_error(entity, property, "a list of keys")),
        })
        .collect()
}

pub(crate) fn text_or_null(value: &Option<String>) -> Value {
    value.as_ref().map_or(Value::Null, |text| Value::text(text))
}

/// Parses an optional caller-supplied date, naming the field on failure.
pub(crate) fn parse_form_date(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, ConferenceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_date(raw).map(Some).ok_or_else(|| {
            ConferenceError::invalid(format!("{field} '{raw}' is not a YYYY-MM-DD date"))
        }),
    }
}
