//! Error taxonomy for the acquisition pipeline

use serde::Serialize;

/// Every way a historical fetch can fail.
///
/// The type is `Clone` because a single producer run is shared by every
/// coalesced caller, and each of them receives its own copy of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Producer did not finish within {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("Failed to launch producer: {0}")]
    ProcessLaunch(String),

    #[error("Producer reported an error: {0}")]
    ProducerReported(String),

    #[error("Producer exited with status {code:?}: {detail}")]
    ProducerFailed { code: Option<i32>, detail: String },

    #[error("Too many malformed data lines: {count} (limit {ceiling})")]
    TooManyParseErrors { count: usize, ceiling: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FetchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::ProcessLaunch(_) => "PROCESS_LAUNCH_ERROR",
            Self::ProducerReported(_) => "PRODUCER_REPORTED_ERROR",
            Self::ProducerFailed { .. } => "PRODUCER_FAILED",
            Self::TooManyParseErrors { .. } => "TOO_MANY_PARSE_ERRORS",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a caller could reasonably try again (usually with a narrower range).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Serializable error body for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&FetchError> for ErrorBody {
    fn from(err: &FetchError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}
