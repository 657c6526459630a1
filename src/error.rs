use thiserror::Error;

use crate::model::{SectionType, TaskType};

/// Failures talking to the exam backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("cannot decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("{endpoint} rejected the request: {message}")]
    Rejected { endpoint: String, message: String },
}

impl ApiError {
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Transport { endpoint, .. }
            | ApiError::Status { endpoint, .. }
            | ApiError::Decode { endpoint, .. }
            | ApiError::Rejected { endpoint, .. } => endpoint,
        }
    }

    /// Short text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport { .. } => "Network unavailable".to_string(),
            ApiError::Status { status, .. } if *status == 401 || *status == 403 => {
                "Not authorized".to_string()
            }
            ApiError::Status { status, .. } => format!("Server error ({})", status),
            ApiError::Decode { .. } => "Unexpected server response".to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("task payload is missing")]
    MissingTask,
    #[error("task of type {task_type:?} has no mocks")]
    MissingMocks { task_type: TaskType },
    #[error("mock {id} was referenced but never resolved")]
    UnresolvedMock { id: i64 },
    #[error("malformed task payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),
    #[error("answer shape does not match question {0}")]
    ShapeMismatch(String),
    #[error("time is up")]
    TimeUp,
    #[error("exam already submitted")]
    Submitted,
    #[error("a submission is already in progress")]
    AlreadySubmitting,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("section switching is disabled in strict mode")]
    SwitchNotAllowed,
    #[error("section {0:?} is not accessible")]
    SectionInaccessible(SectionType),
    #[error("another section action is still pending")]
    ActionPending,
    #[error("no exam session is active")]
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoomError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("this section is locked")]
    SectionLocked,
    #[error("section switching is not available in this mode")]
    NotSynchronized,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt draft {path}: {message} (use --clear to reset)")]
    Corrupt { path: String, message: String },
    #[error("cannot encode draft: {0}")]
    Encode(String),
}

/// Top-level error for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("terminal error: {0}")]
    Terminal(String),
}
