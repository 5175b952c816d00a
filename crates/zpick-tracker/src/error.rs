//! Error types for zpick-tracker

use thiserror::Error;
use zpick_core::PickError;

/// Errors talking to GitHub or Bugzilla.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Base URL or location could not be used
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Pull request title pattern does not compile
    #[error("invalid title pattern: {0}")]
    InvalidPattern(String),

    /// Response body did not have the expected shape
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tracker answered but had no such defect
    #[error("defect {0} not found")]
    DefectNotFound(u64),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Http(err.to_string())
    }
}

impl From<TrackerError> for PickError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::InvalidUrl(_) | TrackerError::InvalidPattern(_) => {
                PickError::Config(err.to_string())
            }
            other => PickError::Transport(other.to_string()),
        }
    }
}
