use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("the document store has been terminated")]
    Terminated,

    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Anonymous sign-in is disabled for this deployment.
    #[error("anonymous sign-in is not allowed")]
    OperationNotAllowed,

    #[error("credential i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a boolean, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },
}

/// Reasons a daily entry submission is rejected before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Error: Application not ready. Please wait or refresh.")]
    NotReady,

    #[error("Please fill in all required fields.")]
    MissingFields,

    #[error("Focus Score must be a number between 1 and 5.")]
    FocusScoreOutOfRange,

    #[error("Key Sales Activity Count must be a non-negative number.")]
    NegativeSalesCount,

    #[error("Please define your Core Habit before submitting a daily entry!")]
    CoreHabitUndefined,
}

#[derive(Debug, Error)]
pub enum HabitError {
    /// Empty input, or no store/user yet. All share one user-facing message.
    #[error("Please enter a habit description.")]
    MissingDescription,

    #[error("Error setting habit. Please try again.")]
    Store(#[from] StoreError),
}

/// Failure to bring up the store or the identity provider.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}
