//! Error types.
//!
//! - `RefreshError` / `FetchFailure`: the typed taxonomy of the refresh pipeline
//! - `AppError`: exit-coded error that reaches `main`
//!
//! Exit codes: `2` for usage/configuration problems, `4` for runtime/data problems.

use std::time::Duration;

use thiserror::Error;

use crate::domain::SeriesId;

/// Why a single series fetch failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    /// The source answered but refused the request (bad id, bad key, bad range).
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("no observations returned")]
    NoData,
    /// The response did not have the expected two-column (date, value) shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Terminal failure of one refresh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshError {
    #[error("malformed date '{input}': {reason}")]
    MalformedDate { input: String, reason: String },
    #[error("no series selected")]
    EmptySelection,
    #[error("failed to fetch {series}: {cause}")]
    Fetch { series: SeriesId, cause: FetchFailure },
}

impl RefreshError {
    pub fn malformed_date(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn fetch(series: &SeriesId, cause: FetchFailure) -> Self {
        Self::Fetch {
            series: series.clone(),
            cause,
        }
    }

    /// Exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedDate { .. } | Self::EmptySelection => 2,
            Self::Fetch { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
