//! Closed whitelists of filterable fields, one enum per entity kind.
//!
//! Each field knows the store property it maps to and the value type its
//! operand is coerced to, so filter dispatch never goes through open string
//! lookups past the initial token resolution.

use crate::catalog::EntityKind;
use crate::catalog::types::{Value, ValueType};
use crate::error::ConferenceError;

pub trait FilterField: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Kind of entity the field belongs to.
    const KIND: EntityKind;
    /// Property every query on this kind is finally ordered by.
    const SECONDARY_SORT: &'static str;
    const ALL: &'static [Self];

    /// Request token naming the field, e.g. `MAX_ATTENDEES`.
    fn token(self) -> &'static str;
    fn property(self) -> &'static str;
    fn value_type(self) -> ValueType;

    fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.token() == token)
    }

    fn coerce(self, raw: &str) -> Result<Value, ConferenceError> {
        self.value_type().coerce(raw).ok_or_else(|| {
            ConferenceError::invalid(format!(
                "filter value '{raw}' for field {} is not a valid {}",
                self.token(),
                self.value_type()
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConferenceField {
    City,
    Topic,
    Month,
    MaxAttendees,
}

impl FilterField for ConferenceField {
    const KIND: EntityKind = EntityKind::Conference;
    const SECONDARY_SORT: &'static str = "name";
    const ALL: &'static [Self] = &[
        ConferenceField::City,
        ConferenceField::Topic,
        ConferenceField::Month,
        ConferenceField::MaxAttendees,
    ];

    fn token(self) -> &'static str {
        match self {
            ConferenceField::City => "CITY",
            ConferenceField::Topic => "TOPIC",
            ConferenceField::Month => "MONTH",
            ConferenceField::MaxAttendees => "MAX_ATTENDEES",
        }
    }

    fn property(self) -> &'static str {
        match self {
            ConferenceField::City => "city",
            ConferenceField::Topic => "topics",
            ConferenceField::Month => "month",
            ConferenceField::MaxAttendees => "maxAttendees",
        }
    }

    fn value_type(self) -> ValueType {
        match self {
            ConferenceField::City | ConferenceField::Topic => ValueType::Text,
            ConferenceField::Month | ConferenceField::MaxAttendees => ValueType::Integer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    Speaker,
    Duration,
    TypeOfSession,
    StartTime,
    Date,
}

impl FilterField for SessionField {
    const KIND: EntityKind = EntityKind::Session;
    const SECONDARY_SORT: &'static str = "startTime";
    const ALL: &'static [Self] = &[
        SessionField::Speaker,
        SessionField::Duration,
        SessionField::TypeOfSession,
        SessionField::StartTime,
        SessionField::Date,
    ];

    fn token(self) -> &'static str {
        match self {
            SessionField::Speaker => "SPEAKER",
            SessionField::Duration => "DURATION",
            SessionField::TypeOfSession => "TYPEOFSESSION",
            SessionField::StartTime => "STARTTIME",
            SessionField::Date => "DATE",
        }
    }

    fn property(self) -> &'static str {
        match self {
            SessionField::Speaker => "speaker",
            SessionField::Duration => "duration",
            SessionField::TypeOfSession => "typeOfSession",
            SessionField::StartTime => "startTime",
            SessionField::Date => "date",
        }
    }

    fn value_type(self) -> ValueType {
        match self {
            SessionField::Speaker | SessionField::TypeOfSession => ValueType::Text,
            SessionField::Duration => ValueType::Integer,
            SessionField::StartTime => ValueType::Time,
            SessionField::Date => ValueType::Date,
        }
    }
}
