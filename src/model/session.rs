use crate::catalog::types::{Entity, Value, format_time_of_day, parse_time_of_day};
use crate::catalog::{EntityKey, EntityKind};
use crate::error::ConferenceError;
use crate::model::{
    expect_kind, optional_date, optional_integer, optional_text, optional_time, parse_form_date,
    required_text, text_or_null,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const HIGHLIGHTS: &str = "highlights";
pub const SPEAKER: &str = "speaker";
pub const DURATION: &str = "duration";
pub const TYPE_OF_SESSION: &str = "typeOfSession";
pub const DATE: &str = "date";
pub const START_TIME: &str = "startTime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Child of the owning conference's key.
    pub key: EntityKey,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker: Option<String>,
    /// Minutes.
    pub duration: Option<i64>,
    pub type_of_session: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionForm {
    pub name: Option<String>,
    pub highlights: Option<String>,
    pub speaker: Option<String>,
    pub duration: Option<i64>,
    pub type_of_session: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`.
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub websafe_key: String,
    pub websafe_conference_key: String,
    pub name: String,
    pub highlights: Option<String>,
    pub speaker: Option<String>,
    pub duration: Option<i64>,
    pub type_of_session: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
}

impl Session {
    pub fn from_form(key: EntityKey, form: &SessionForm) -> Result<Self, ConferenceError> {
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConferenceError::invalid("session 'name' field required"))?;
        if form.duration.is_some_and(|minutes| minutes < 0) {
            return Err(ConferenceError::invalid("duration must not be negative"));
        }
        let start_time = match form.start_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_time_of_day(raw).ok_or_else(|| {
                ConferenceError::invalid(format!("startTime '{raw}' is not an HH:MM time"))
            })?),
        };
        Ok(Self {
            key,
            name: name.to_string(),
            highlights: form.highlights.clone(),
            speaker: form.speaker.clone(),
            duration: form.duration,
            type_of_session: form.type_of_session.clone(),
            date: parse_form_date(DATE, form.date.as_deref())?,
            start_time,
        })
    }

    pub fn conference_key(&self) -> Option<EntityKey> {
        self.key.parent()
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with(NAME, Value::text(&self.name))
            .with(HIGHLIGHTS, text_or_null(&self.highlights))
            .with(SPEAKER, text_or_null(&self.speaker))
            .with(DURATION, self.duration.map_or(Value::Null, Value::Integer))
            .with(TYPE_OF_SESSION, text_or_null(&self.type_of_session))
            .with(DATE, self.date.map_or(Value::Null, Value::Date))
            .with(START_TIME, self.start_time.map_or(Value::Null, Value::Time))
    }

    pub fn from_entity(entity: &Entity) -> Result<Self, ConferenceError> {
        expect_kind(entity, EntityKind::Session)?;
        Ok(Self {
            key: entity.key.clone(),
            name: required_text(entity, NAME)?,
            highlights: optional_text(entity, HIGHLIGHTS)?,
            speaker: optional_text(entity, SPEAKER)?,
            duration: optional_integer(entity, DURATION)?,
            type_of_session: optional_text(entity, TYPE_OF_SESSION)?,
            date: optional_date(entity, DATE)?,
            start_time: optional_time(entity, START_TIME)?,
        })
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            websafe_key: self.key.to_websafe(),
            websafe_conference_key: self
                .conference_key()
                .map(|key| key.to_websafe())
                .unwrap_or_default(),
            name: self.name.clone(),
            highlights: self.highlights.clone(),
            speaker: self.speaker.clone(),
            duration: self.duration,
            type_of_session: self.type_of_session.clone(),
            date: self.date.map(|d| d.to_string()),
            start_time: self.start_time.as_ref().map(format_time_of_day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionForm};
    use crate::catalog::{EntityKey, EntityKind};

    fn key() -> EntityKey {
        EntityKey::root(EntityKind::Profile, "u1")
            .child(EntityKind::Conference, 1u64)
            .child(EntityKind::Session, 2u64)
    }

    #[test]
    fn form_parses_date_and_time_of_day() {
        let session = Session::from_form(
            key(),
            &SessionForm {
                name: Some("Ownership".into()),
                speaker: Some("Grace".into()),
                duration: Some(45),
                date: Some("2016-06-21".into()),
                start_time: Some("14:30".into()),
                ..SessionForm::default()
            },
        )
        .expect("valid form");
        let view = session.view();
        assert_eq!(view.start_time.as_deref(), Some("14:30"));
        assert_eq!(view.date.as_deref(), Some("2016-06-21"));
        assert_eq!(
            view.websafe_conference_key,
            key().parent().expect("parent").to_websafe()
        );
        assert_eq!(Session::from_entity(&session.to_entity()).expect("decode"), session);
    }

    #[test]
    fn invalid_forms_are_rejected() {
        let blank = SessionForm {
            name: Some(" ".into()),
            ..SessionForm::default()
        };
        assert!(Session::from_form(key(), &blank).is_err());
        let bad_time = SessionForm {
            name: Some("Talk".into()),
            start_time: Some("2pm".into()),
            ..SessionForm::default()
        };
        let err = Session::from_form(key(), &bad_time).expect_err("bad time");
        assert!(err.to_string().contains("startTime"));
    }
}
