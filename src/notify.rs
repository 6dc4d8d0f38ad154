//! Fire-and-forget background work triggered by mutations.

use crate::ConferenceApi;
use crate::error::ConferenceError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Tell an organizer their conference was created.
    SendConfirmationEmail {
        email: String,
        conference_info: String,
    },
    /// Recompute the featured speaker after a session is added.
    SetFeaturedSpeaker {
        speaker: String,
        websafe_conference_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("task queue closed")]
    Closed,
    #[error("mail transport failed: {0}")]
    Transport(String),
}

pub trait NotificationDispatcher: Send + Sync {
    fn enqueue(&self, task: Task) -> Result<(), NotifyError>;
}

/// Dispatcher backed by an unbounded in-process queue.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<Task>,
}

pub type TaskReceiver = mpsc::UnboundedReceiver<Task>;

impl ChannelDispatcher {
    pub fn new() -> (Self, TaskReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn enqueue(&self, task: Task) -> Result<(), NotifyError> {
        self.sender.send(task).map_err(|_| NotifyError::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait MailTransport: Send + Sync {
    fn send(&self, mail: Mail) -> Result<(), NotifyError>;
}

/// Transport that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().clone()
    }
}

impl MailTransport for MemoryMailbox {
    fn send(&self, mail: Mail) -> Result<(), NotifyError> {
        self.sent.lock().push(mail);
        Ok(())
    }
}

/// Consumes queued tasks. [`TaskWorker::run`] ends once every dispatcher
/// handle is dropped.
pub struct TaskWorker {
    api: Arc<ConferenceApi>,
    mail: Arc<dyn MailTransport>,
    receiver: TaskReceiver,
}

impl TaskWorker {
    pub fn new(api: Arc<ConferenceApi>, mail: Arc<dyn MailTransport>, receiver: TaskReceiver) -> Self {
        Self {
            api,
            mail,
            receiver,
        }
    }

    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }

    /// Returns the number of tasks handled. Task failures are logged and
    /// never stop the worker.
    pub async fn run(mut self) -> usize {
        let mut handled = 0;
        while let Some(task) = self.receiver.recv().await {
            if let Err(err) = self.handle(&task).await {
                warn!(?task, error = %err, "background task failed");
            }
            handled += 1;
        }
        debug!(handled, "task queue drained");
        handled
    }

    /// Handles whatever is queued right now and returns without waiting for
    /// more.
    pub async fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(task) = self.receiver.try_recv() {
            if let Err(err) = self.handle(&task).await {
                warn!(?task, error = %err, "background task failed");
            }
            handled += 1;
        }
        handled
    }

    async fn handle(&self, task: &Task) -> Result<(), ConferenceError> {
        match task {
            Task::SendConfirmationEmail {
                email,
                conference_info,
            } => self
                .mail
                .send(Mail {
                    to: email.clone(),
                    subject: "You created a new Conference!".to_string(),
                    body: format!(
                        "Hi, you have created a following conference:\r\n\r\n{conference_info}"
                    ),
                })
                .map_err(|e| ConferenceError::Transient(e.to_string())),
            Task::SetFeaturedSpeaker {
                speaker,
                websafe_conference_key,
            } => self
                .api
                .set_featured_speaker(speaker, websafe_conference_key)
                .await
                .map(|_| ()),
        }
    }
}
