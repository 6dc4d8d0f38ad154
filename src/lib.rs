pub mod cache;
pub mod catalog;
pub mod commit;
pub mod config;
pub mod error;
pub mod identity;
mod lib_helpers;
pub mod model;
pub mod notify;
pub mod query;
pub mod storage;

use crate::cache::{AnnouncementCache, CacheKey, MemoryCache};
use crate::catalog::types::Value;
use crate::catalog::{EntityKey, EntityKind};
use crate::commit::registration::load_or_create_profile;
use crate::commit::{TransactionScope, registration, run_in_transaction, wishlist};
use crate::config::ConferenceConfig;
use crate::error::{ConferenceError, ResourceType};
use crate::identity::{Identity, require};
use crate::lib_helpers::*;
use crate::model::{
    Conference, ConferenceForm, ConferenceUpdate, ConferenceView, Profile, ProfileMiniForm,
    ProfileView, Session, SessionForm, SessionView,
};
use crate::notify::{ChannelDispatcher, NotificationDispatcher, Task, TaskReceiver};
use crate::query::fields::{ConferenceField, SessionField};
use crate::query::plan::{Operator, RawFilter, StoreQuery};
use crate::query::{execute_query, execute_two_inequality};
use crate::storage::EntityStore;
use crate::storage::memory::MemoryStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Request/response surface of the conference service.
///
/// Every operation that acts for a user takes the verified caller as
/// `Option<&Identity>`; `None` means the request carried no credentials.
pub struct ConferenceApi {
    config: ConferenceConfig,
    store: Arc<dyn EntityStore>,
    cache: Arc<dyn AnnouncementCache>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ConferenceApi {
    pub fn new(
        config: ConferenceConfig,
        store: Arc<dyn EntityStore>,
        cache: Arc<dyn AnnouncementCache>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, ConferenceError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            cache,
            dispatcher,
        })
    }

    /// Wires the in-memory store, cache and task queue. The returned receiver
    /// feeds a [`notify::TaskWorker`].
    pub fn in_memory(config: ConferenceConfig) -> Result<(Self, TaskReceiver), ConferenceError> {
        let (dispatcher, receiver) = ChannelDispatcher::new();
        let api = Self::new(
            config,
            MemoryStore::shared(),
            Arc::new(MemoryCache::new()),
            Arc::new(dispatcher),
        )?;
        Ok((api, receiver))
    }

    pub fn config(&self) -> &ConferenceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    fn dispatch(&self, task: Task) {
        if let Err(err) = self.dispatcher.enqueue(task) {
            warn!(error = %err, "failed to enqueue background task");
        }
    }

    fn load_conference(&self, key: &EntityKey) -> Result<Conference, ConferenceError> {
        let found = self.store.get(key)?.ok_or_else(|| {
            ConferenceError::not_found(ResourceType::Conference, key.to_websafe())
        })?;
        Conference::from_entity(&found.entity)
    }

    fn conference_views(
        &self,
        conferences: Vec<Conference>,
    ) -> Result<Vec<ConferenceView>, ConferenceError> {
        let names = organizer_names(self.store.as_ref(), &conferences)?;
        Ok(conferences
            .iter()
            .map(|conf| conf.view(names.get(&conf.key.group()).map(String::as_str)))
            .collect())
    }

    // Profiles

    pub async fn get_profile(
        &self,
        caller: Option<&Identity>,
    ) -> Result<ProfileView, ConferenceError> {
        let identity = require(caller)?;
        let scope = TransactionScope::single(identity.profile_key());
        let profile = run_in_transaction(self.store.as_ref(), &scope, &self.config.retry, |tx| {
            ensure_profile(tx, identity)
        })
        .await?;
        Ok(profile.view())
    }

    pub async fn save_profile(
        &self,
        caller: Option<&Identity>,
        form: ProfileMiniForm,
    ) -> Result<ProfileView, ConferenceError> {
        let identity = require(caller)?;
        let scope = TransactionScope::single(identity.profile_key());
        let profile = run_in_transaction(self.store.as_ref(), &scope, &self.config.retry, |tx| {
            let mut profile = load_or_create_profile(tx, identity)?;
            profile.apply_mini_form(&form);
            tx.put(profile.to_entity())?;
            Ok(profile)
        })
        .await?;
        Ok(profile.view())
    }

    // Conferences

    pub async fn create_conference(
        &self,
        caller: Option<&Identity>,
        form: ConferenceForm,
    ) -> Result<ConferenceView, ConferenceError> {
        let identity = require(caller)?;
        let profile_key = identity.profile_key();
        let key = self
            .store
            .allocate_id(EntityKind::Conference, Some(&profile_key))?;
        let conference = Conference::from_form(key, &form, &identity.user_id, &self.config)?;
        let scope = TransactionScope::single(profile_key);
        let organizer = run_in_transaction(self.store.as_ref(), &scope, &self.config.retry, |tx| {
            let profile = ensure_profile(tx, identity)?;
            tx.put(conference.to_entity())?;
            Ok(profile.display_name)
        })
        .await?;
        info!(
            conference = %conference.key,
            organizer = %identity.user_id,
            max_attendees = conference.max_attendees,
            "conference created"
        );
        let view = conference.view(Some(&organizer));
        self.dispatch(Task::SendConfirmationEmail {
            email: identity.email.clone(),
            conference_info: describe_conference(&view),
        });
        Ok(view)
    }

    pub async fn update_conference(
        &self,
        caller: Option<&Identity>,
        websafe_conference_key: &str,
        update: ConferenceUpdate,
    ) -> Result<ConferenceView, ConferenceError> {
        let identity = require(caller)?;
        let key = parse_conference_key(websafe_conference_key)?;
        let scope = TransactionScope::single(key.group());
        let (conference, organizer) =
            run_in_transaction(self.store.as_ref(), &scope, &self.config.retry, |tx| {
                let entity = tx.get(&key)?.ok_or_else(|| {
                    ConferenceError::not_found(ResourceType::Conference, websafe_conference_key)
                })?;
                let mut conference = Conference::from_entity(&entity)?;
                if !conference.is_organized_by(&identity.user_id) {
                    return Err(ConferenceError::Forbidden(
                        "only the owner can update the conference".to_string(),
                    ));
                }
                conference.apply_update(&update)?;
                tx.put(conference.to_entity())?;
                let organizer = match tx.get(&key.group())? {
                    Some(profile) => Some(Profile::from_entity(&profile)?.display_name),
                    None => None,
                };
                Ok((conference, organizer))
            })
            .await?;
        info!(conference = %conference.key, "conference updated");
        Ok(conference.view(organizer.as_deref()))
    }

    pub async fn get_conference(
        &self,
        websafe_conference_key: &str,
    ) -> Result<ConferenceView, ConferenceError> {
        let key = parse_conference_key(websafe_conference_key)?;
        let conference = self.load_conference(&key)?;
        let mut views = self.conference_views(vec![conference])?;
        views
            .pop()
            .ok_or_else(|| ConferenceError::not_found(ResourceType::Conference, websafe_conference_key))
    }

    /// Conferences organized by the caller.
    pub async fn get_conferences_created(
        &self,
        caller: Option<&Identity>,
    ) -> Result<Vec<ConferenceView>, ConferenceError> {
        let identity = require(caller)?;
        let conferences = self
            .store
            .query_by_ancestor(EntityKind::Conference, &identity.profile_key())?
            .map(|entity| Conference::from_entity(&entity))
            .collect::<Result<Vec<_>, _>>()?;
        self.conference_views(conferences)
    }

    /// Conferences the caller is registered for.
    pub async fn get_conferences_to_attend(
        &self,
        caller: Option<&Identity>,
    ) -> Result<Vec<ConferenceView>, ConferenceError> {
        let identity = require(caller)?;
        let Some(found) = self.store.get(&identity.profile_key())? else {
            return Ok(Vec::new());
        };
        let profile = Profile::from_entity(&found.entity)?;
        let conferences = self
            .store
            .get_many(&profile.conference_keys_to_attend)?
            .iter()
            .flatten()
            .map(Conference::from_entity)
            .collect::<Result<Vec<_>, _>>()?;
        self.conference_views(conferences)
    }

    /// Conferences matching every criterion, ordered by the inequality field
    /// (if any) and then by name.
    pub async fn query_conferences(
        &self,
        filters: &[RawFilter],
    ) -> Result<Vec<ConferenceView>, ConferenceError> {
        let conferences = execute_query::<ConferenceField>(self.store.as_ref(), filters, None)?
            .map(|entity| Conference::from_entity(&entity))
            .collect::<Result<Vec<_>, _>>()?;
        self.conference_views(conferences)
    }

    // Registration

    pub async fn register_for_conference(
        &self,
        caller: Option<&Identity>,
        websafe_conference_key: &str,
    ) -> Result<bool, ConferenceError> {
        let identity = require(caller)?;
        let key = parse_conference_key(websafe_conference_key)?;
        registration::register(self.store.as_ref(), &self.config.retry, identity, &key).await
    }

    pub async fn unregister_from_conference(
        &self,
        caller: Option<&Identity>,
        websafe_conference_key: &str,
    ) -> Result<bool, ConferenceError> {
        let identity = require(caller)?;
        let key = parse_conference_key(websafe_conference_key)?;
        registration::unregister(self.store.as_ref(), &self.config.retry, identity, &key).await
    }

    // Sessions

    /// Adds a session to a conference the caller organizes.
    pub async fn create_session(
        &self,
        caller: Option<&Identity>,
        websafe_conference_key: &str,
        form: SessionForm,
    ) -> Result<SessionView, ConferenceError> {
        let identity = require(caller)?;
        let conference_key = parse_conference_key(websafe_conference_key)?;
        let conference = self.load_conference(&conference_key)?;
        if !conference.is_organized_by(&identity.user_id) {
            return Err(ConferenceError::Forbidden(
                "only the conference organizer can add sessions".to_string(),
            ));
        }
        let key = self
            .store
            .allocate_id(EntityKind::Session, Some(&conference_key))?;
        let session = Session::from_form(key, &form)?;
        self.store.put_all(vec![session.to_entity()])?;
        info!(session = %session.key, conference = %conference_key, "session created");
        if let Some(speaker) = session.speaker.clone() {
            self.dispatch(Task::SetFeaturedSpeaker {
                speaker,
                websafe_conference_key: websafe_conference_key.to_string(),
            });
        }
        Ok(session.view())
    }

    pub async fn get_conference_sessions(
        &self,
        websafe_conference_key: &str,
    ) -> Result<Vec<SessionView>, ConferenceError> {
        let key = parse_conference_key(websafe_conference_key)?;
        self.load_conference(&key)?;
        session_views(self.store.query_by_ancestor(EntityKind::Session, &key)?)
    }

    pub async fn get_conference_sessions_by_type(
        &self,
        websafe_conference_key: &str,
        type_of_session: &str,
    ) -> Result<Vec<SessionView>, ConferenceError> {
        let key = parse_conference_key(websafe_conference_key)?;
        self.load_conference(&key)?;
        let query = StoreQuery::kind(EntityKind::Session)
            .ancestor(key)
            .filter(
                crate::model::session::TYPE_OF_SESSION,
                Operator::Eq,
                Value::text(type_of_session),
            );
        session_views(self.store.query_with_filters(&query)?)
    }

    /// Sessions given by `speaker` across all conferences.
    pub async fn get_sessions_by_speaker(
        &self,
        speaker: &str,
    ) -> Result<Vec<SessionView>, ConferenceError> {
        let query = StoreQuery::kind(EntityKind::Session).filter(
            crate::model::session::SPEAKER,
            Operator::Eq,
            Value::text(speaker),
        );
        session_views(self.store.query_with_filters(&query)?)
    }

    pub async fn get_sessions_with_filters(
        &self,
        filters: &[RawFilter],
    ) -> Result<Vec<SessionView>, ConferenceError> {
        session_views(execute_query::<SessionField>(
            self.store.as_ref(),
            filters,
            None,
        )?)
    }

    /// Applies all criteria, where the second one is evaluated in memory and
    /// may name a second inequality field.
    pub async fn get_sessions_two_inequality(
        &self,
        filters: &[RawFilter],
    ) -> Result<Vec<SessionView>, ConferenceError> {
        session_views(execute_two_inequality::<SessionField>(
            self.store.as_ref(),
            filters,
            None,
        )?)
    }

    // Wish list

    pub async fn add_session_to_wishlist(
        &self,
        caller: Option<&Identity>,
        websafe_session_keys: &[String],
    ) -> Result<Vec<SessionView>, ConferenceError> {
        let identity = require(caller)?;
        let sessions = wishlist::add(
            self.store.as_ref(),
            &self.config.retry,
            identity,
            websafe_session_keys,
        )
        .await?;
        Ok(sessions.iter().map(Session::view).collect())
    }

    pub async fn delete_session_in_wishlist(
        &self,
        caller: Option<&Identity>,
        websafe_session_keys: &[String],
    ) -> Result<(), ConferenceError> {
        let identity = require(caller)?;
        wishlist::remove(
            self.store.as_ref(),
            &self.config.retry,
            identity,
            websafe_session_keys,
        )
        .await
    }

    pub async fn get_sessions_in_wishlist(
        &self,
        caller: Option<&Identity>,
    ) -> Result<Vec<SessionView>, ConferenceError> {
        let identity = require(caller)?;
        let sessions = wishlist::list(self.store.as_ref(), identity)?;
        Ok(sessions.iter().map(Session::view).collect())
    }

    // Announcements

    /// Recomputes the nearly-sold-out announcement and stores it in the
    /// cache, or clears the cache entry when nothing qualifies.
    pub async fn cache_announcement(&self) -> Result<String, ConferenceError> {
        let seats = crate::model::conference::SEATS_AVAILABLE;
        let query = StoreQuery::kind(EntityKind::Conference)
            .filter(seats, Operator::Gt, Value::Integer(0))
            .filter(
                seats,
                Operator::Lte,
                Value::Integer(self.config.announcement_seat_threshold),
            )
            .order_by(seats);
        let names = self
            .store
            .query_with_filters(&query)?
            .map(|entity| Conference::from_entity(&entity).map(|conf| conf.name))
            .collect::<Result<Vec<_>, _>>()?;
        let announcement = announcement_text(&names);
        if announcement.is_empty() {
            self.cache.delete(CacheKey::RecentAnnouncements);
        } else {
            self.cache
                .set(CacheKey::RecentAnnouncements, announcement.clone());
        }
        Ok(announcement)
    }

    pub async fn get_announcement(&self) -> String {
        self.cache
            .get(CacheKey::RecentAnnouncements)
            .unwrap_or_default()
    }

    /// Features `speaker` when they give more than one session at the
    /// conference; otherwise clears the featured text.
    pub async fn set_featured_speaker(
        &self,
        speaker: &str,
        websafe_conference_key: &str,
    ) -> Result<String, ConferenceError> {
        let key = parse_conference_key(websafe_conference_key)?;
        self.load_conference(&key)?;
        let query = StoreQuery::kind(EntityKind::Session).ancestor(key).filter(
            crate::model::session::SPEAKER,
            Operator::Eq,
            Value::text(speaker),
        );
        let names = self
            .store
            .query_with_filters(&query)?
            .map(|entity| Session::from_entity(&entity).map(|session| session.name))
            .collect::<Result<Vec<_>, _>>()?;
        let text = featured_speaker_text(speaker, &names);
        self.cache.set(CacheKey::FeaturedSpeaker, text.clone());
        Ok(text)
    }

    pub async fn get_featured_speaker(&self) -> String {
        self.cache
            .get(CacheKey::FeaturedSpeaker)
            .unwrap_or_default()
    }
}

/// Refreshes the announcement immediately and then every
/// `announcement_refresh_interval_ms` until the returned handle is aborted.
pub fn spawn_announcement_refresher(api: Arc<ConferenceApi>) -> JoinHandle<()> {
    let interval = api.config().announcement_refresh_interval();
    tokio::spawn(async move {
        loop {
            if let Err(err) = api.cache_announcement().await {
                warn!(error = %err, "announcement refresh failed");
            }
            tokio::time::sleep(interval).await;
        }
    })
}
