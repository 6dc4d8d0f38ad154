use crate::catalog::types::{Entity, Value};
use crate::catalog::{EntityKey, EntityKind};
use crate::config::ConferenceConfig;
use crate::error::ConferenceError;
use crate::model::{
    expect_kind, optional_date, optional_text, parse_form_date, required_integer, required_text,
    text_list, text_or_null,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const TOPICS: &str = "topics";
pub const CITY: &str = "city";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const MONTH: &str = "month";
pub const MAX_ATTENDEES: &str = "maxAttendees";
pub const SEATS_AVAILABLE: &str = "seatsAvailable";
pub const ORGANIZER_USER_ID: &str = "organizerUserId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conference {
    /// Child of the organizer's profile key.
    pub key: EntityKey,
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Month of `start_date`, 0 without one.
    pub month: i64,
    pub max_attendees: i64,
    pub seats_available: i64,
    pub organizer_user_id: String,
}

/// Creation request. Missing city, topics and capacity take configured
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_attendees: Option<i64>,
}

/// Partial update; only supplied fields are copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topics: Option<Vec<String>>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_attendees: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceView {
    pub websafe_key: String,
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: i64,
    pub max_attendees: i64,
    pub seats_available: i64,
    pub organizer_user_id: String,
    pub organizer_display_name: Option<String>,
}

fn month_of(start_date: Option<NaiveDate>) -> i64 {
    start_date.map_or(0, |date| i64::from(date.month()))
}

impl Conference {
    pub fn from_form(
        key: EntityKey,
        form: &ConferenceForm,
        organizer_user_id: &str,
        config: &ConferenceConfig,
    ) -> Result<Self, ConferenceError> {
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConferenceError::invalid("conference 'name' field required"))?;
        let max_attendees = form.max_attendees.unwrap_or(0);
        if max_attendees < 0 {
            return Err(ConferenceError::invalid("maxAttendees must not be negative"));
        }
        let city = form
            .city
            .clone()
            .filter(|city| !city.is_empty())
            .unwrap_or_else(|| config.default_city.clone());
        let topics = if form.topics.is_empty() {
            config.default_topics.clone()
        } else {
            form.topics.clone()
        };
        let start_date = parse_form_date(START_DATE, form.start_date.as_deref())?;
        let end_date = parse_form_date(END_DATE, form.end_date.as_deref())?;
        Ok(Self {
            key,
            name: name.to_string(),
            description: form.description.clone(),
            topics,
            city: Some(city),
            start_date,
            end_date,
            month: month_of(start_date),
            max_attendees,
            seats_available: max_attendees,
            organizer_user_id: organizer_user_id.to_string(),
        })
    }

    /// Copies supplied fields. Capacity is fixed at creation, so a differing
    /// `max_attendees` is rejected and nothing changes.
    pub fn apply_update(&mut self, update: &ConferenceUpdate) -> Result<(), ConferenceError> {
        if let Some(max) = update.max_attendees
            && max != self.max_attendees
        {
            return Err(ConferenceError::invalid(
                "maxAttendees cannot change after creation",
            ));
        }
        let start_date = parse_form_date(START_DATE, update.start_date.as_deref())?;
        let end_date = parse_form_date(END_DATE, update.end_date.as_deref())?;

        if let Some(name) = update.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(ConferenceError::invalid("conference 'name' must not be blank"));
            }
            self.name = name.to_string();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(topics) = update.topics.as_ref().filter(|t| !t.is_empty()) {
            self.topics = topics.clone();
        }
        if let Some(city) = &update.city {
            self.city = Some(city.clone());
        }
        if start_date.is_some() {
            self.start_date = start_date;
            self.month = month_of(start_date);
        }
        if end_date.is_some() {
            self.end_date = end_date;
        }
        Ok(())
    }

    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.organizer_user_id == user_id
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with(NAME, Value::text(&self.name))
            .with(DESCRIPTION, text_or_null(&self.description))
            .with(
                TOPICS,
                Value::List(self.topics.iter().map(Value::text).collect()),
            )
            .with(CITY, text_or_null(&self.city))
            .with(START_DATE, self.start_date.map_or(Value::Null, Value::Date))
            .with(END_DATE, self.end_date.map_or(Value::Null, Value::Date))
            .with(MONTH, Value::Integer(self.month))
            .with(MAX_ATTENDEES, Value::Integer(self.max_attendees))
            .with(SEATS_AVAILABLE, Value::Integer(self.seats_available))
            .with(ORGANIZER_USER_ID, Value::text(&self.organizer_user_id))
    }

    pub fn from_entity(entity: &Entity) -> Result<Self, ConferenceError> {
        expect_kind(entity, EntityKind::Conference)?;
        Ok(Self {
            key: entity.key.clone(),
            name: required_text(entity, NAME)?,
            description: optional_text(entity, DESCRIPTION)?,
            topics: text_list(entity, TOPICS)?,
            city: optional_text(entity, CITY)?,
            start_date: optional_date(entity, START_DATE)?,
            end_date: optional_date(entity, END_DATE)?,
            month: required_integer(entity, MONTH)?,
            max_attendees: required_integer(entity, MAX_ATTENDEES)?,
            seats_available: required_integer(entity, SEATS_AVAILABLE)?,
            organizer_user_id: required_text(entity, ORGANIZER_USER_ID)?,
        })
    }

    pub fn view(&self, organizer_display_name: Option<&str>) -> ConferenceView {
        ConferenceView {
            websafe_key: self.key.to_websafe(),
            name: self.name.clone(),
            description: self.description.clone(),
            topics: self.topics.clone(),
            city: self.city.clone(),
            start_date: self.start_date.map(|d| d.to_string()),
            end_date: self.end_date.map(|d| d.to_string()),
            month: self.month,
            max_attendees: self.max_attendees,
            seats_available: self.seats_available,
            organizer_user_id: self.organizer_user_id.clone(),
            organizer_display_name: organizer_display_name.map(str::to_string),
        }
    }
}
