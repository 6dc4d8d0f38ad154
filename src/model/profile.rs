use crate::catalog::types::{Entity, Value};
use crate::catalog::{EntityKey, EntityKind, KeyId};
use crate::error::ConferenceError;
use crate::identity::Identity;
use crate::model::{expect_kind, key_list, required_text};
use serde::{Deserialize, Serialize};

pub const DISPLAY_NAME: &str = "displayName";
pub const MAIN_EMAIL: &str = "mainEmail";
pub const TEE_SHIRT_SIZE: &str = "teeShirtSize";
pub const CONFERENCE_KEYS_TO_ATTEND: &str = "conferenceKeysToAttend";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeeShirtSize {
    #[default]
    #[serde(rename = "NOT_SPECIFIED")]
    NotSpecified,
    #[serde(rename = "XS_M")]
    XsM,
    #[serde(rename = "XS_W")]
    XsW,
    #[serde(rename = "S_M")]
    SM,
    #[serde(rename = "S_W")]
    SW,
    #[serde(rename = "M_M")]
    MM,
    #[serde(rename = "M_W")]
    MW,
    #[serde(rename = "L_M")]
    LM,
    #[serde(rename = "L_W")]
    LW,
    #[serde(rename = "XL_M")]
    XlM,
    #[serde(rename = "XL_W")]
    XlW,
    #[serde(rename = "XXL_M")]
    XxlM,
    #[serde(rename = "XXL_W")]
    XxlW,
    #[serde(rename = "XXXL_M")]
    XxxlM,
    #[serde(rename = "XXXL_W")]
    XxxlW,
}

impl TeeShirtSize {
    pub const ALL: [TeeShirtSize; 15] = [
        TeeShirtSize::NotSpecified,
        TeeShirtSize::XsM,
        TeeShirtSize::XsW,
        TeeShirtSize::SM,
        TeeShirtSize::SW,
        TeeShirtSize::MM,
        TeeShirtSize::MW,
        TeeShirtSize::LM,
        TeeShirtSize::LW,
        TeeShirtSize::XlM,
        TeeShirtSize::XlW,
        TeeShirtSize::XxlM,
        TeeShirtSize::XxlW,
        TeeShirtSize::XxxlM,
        TeeShirtSize::XxxlW,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TeeShirtSize::NotSpecified => "NOT_SPECIFIED",
            TeeShirtSize::XsM => "XS_M",
            TeeShirtSize::XsW => "XS_W",
            TeeShirtSize::SM => "S_M",
            TeeShirtSize::SW => "S_W",
            TeeShirtSize::MM => "M_M",
            TeeShirtSize::MW => "M_W",
            TeeShirtSize::LM => "L_M",
            TeeShirtSize::LW => "L_W",
            TeeShirtSize::XlM => "XL_M",
            TeeShirtSize::XlW => "XL_W",
            TeeShirtSize::XxlM => "XXL_M",
            TeeShirtSize::XxlW => "XXL_W",
            TeeShirtSize::XxxlM => "XXXL_M",
            TeeShirtSize::XxxlW => "XXXL_W",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// `Profile(user_id)`, root of the user's entity group.
    pub key: EntityKey,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub conference_keys_to_attend: Vec<EntityKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileMiniForm {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub conference_keys_to_attend: Vec<String>,
}

impl Profile {
    /// Profile created on first access.
    pub fn new_for(identity: &Identity) -> Self {
        Self {
            key: identity.profile_key(),
            display_name: identity.display_name.clone(),
            main_email: identity.email.clone(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conference_keys_to_attend: Vec::new(),
        }
    }

    pub fn user_id(&self) -> String {
        match self.key.id() {
            KeyId::Name(name) => name.clone(),
            KeyId::Int(id) => id.to_string(),
        }
    }

    pub fn attends(&self, conference_key: &EntityKey) -> bool {
        self.conference_keys_to_attend.contains(conference_key)
    }

    /// Returns false when the key was already present.
    pub fn add_attendance(&mut self, conference_key: &EntityKey) -> bool {
        if self.attends(conference_key) {
            return false;
        }
        self.conference_keys_to_attend.push(conference_key.clone());
        true
    }

    /// Returns false when the key was not present.
    pub fn remove_attendance(&mut self, conference_key: &EntityKey) -> bool {
        let before = self.conference_keys_to_attend.len();
        self.conference_keys_to_attend
            .retain(|key| key != conference_key);
        self.conference_keys_to_attend.len() != before
    }

    pub fn apply_mini_form(&mut self, form: &ProfileMiniForm) {
        if let Some(name) = form.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.display_name = name.to_string();
        }
        if let Some(size) = form.tee_shirt_size {
            self.tee_shirt_size = size;
        }
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.key.clone())
            .with(DISPLAY_NAME, Value::text(&self.display_name))
            .with(MAIN_EMAIL, Value::text(&self.main_email))
            .with(TEE_SHIRT_SIZE, Value::text(self.tee_shirt_size.as_str()))
            .with(
                CONFERENCE_KEYS_TO_ATTEND,
                Value::List(
                    self.conference_keys_to_attend
                        .iter()
                        .cloned()
                        .map(Value::Key)
                        .collect(),
                ),
            )
    }

    pub fn from_entity(entity: &Entity) -> Result<Self, ConferenceError> {
        expect_kind(entity, EntityKind::Profile)?;
        let raw_size = required_text(entity, TEE_SHIRT_SIZE)?;
        let tee_shirt_size = TeeShirtSize::parse(&raw_size).ok_or_else(|| {
            ConferenceError::Decode(format!(
                "{}: unknown tee shirt size '{raw_size}'",
                entity.key
            ))
        })?;
        Ok(Self {
            key: entity.key.clone(),
            display_name: required_text(entity, DISPLAY_NAME)?,
            main_email: required_text(entity, MAIN_EMAIL)?,
            tee_shirt_size,
            conference_keys_to_attend: key_list(entity, CONFERENCE_KEYS_TO_ATTEND)?,
        })
    }

    pub fn view(&self) -> ProfileView {
        ProfileView {
            display_name: self.display_name.clone(),
            main_email: self.main_email.clone(),
            tee_shirt_size: self.tee_shirt_size,
            conference_keys_to_attend: self
                .conference_keys_to_attend
                .iter()
                .map(EntityKey::to_websafe)
                .collect(),
        }
    }
}
