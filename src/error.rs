use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Conference,
    Session,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Conference => write!(f, "conference"),
            ResourceType::Session => write!(f, "session"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthenticated,
    InvalidArgument,
    ConferenceNotFound,
    SessionNotFound,
    Forbidden,
    Conflict,
    Transient,
    Decode,
    Store,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::ConferenceNotFound => "conference_not_found",
            ErrorCode::SessionNotFound => "session_not_found",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Transient => "transient",
            ErrorCode::Decode => "decode",
            ErrorCode::Store => "store",
        }
    }

    /// Whether a caller may reasonably resubmit the same request.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCode::Transient)
    }
}

#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error("authorization required")]
    Unauthenticated,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConferenceError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ConferenceError::InvalidArgument(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        ConferenceError::Conflict(reason.into())
    }

    pub fn not_found(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        ConferenceError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConferenceError::Unauthenticated => ErrorCode::Unauthenticated,
            ConferenceError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ConferenceError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Conference => ErrorCode::ConferenceNotFound,
                ResourceType::Session => ErrorCode::SessionNotFound,
            },
            ConferenceError::Forbidden(_) => ErrorCode::Forbidden,
            ConferenceError::Conflict(_) => ErrorCode::Conflict,
            ConferenceError::Transient(_) => ErrorCode::Transient,
            ConferenceError::Decode(_) => ErrorCode::Decode,
            ConferenceError::Store(StoreError::InvalidQuery { .. }) => ErrorCode::InvalidArgument,
            ConferenceError::Store(StoreError::OutsideScope { .. }) => ErrorCode::InvalidArgument,
            ConferenceError::Store(_) => ErrorCode::Store,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
