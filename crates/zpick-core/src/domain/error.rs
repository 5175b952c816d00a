//! Error taxonomy for zpick.

/// Errors produced while planning a z-stream pick run.
///
/// Only fatal conditions are represented here. Per-candidate data problems
/// (an unparseable priority, an empty component path) degrade to a neutral
/// score contribution and never become a `PickError`.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("scoring error: {0}")]
    Scoring(String),

    #[error("run cancelled before every candidate was scored")]
    Cancelled,

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for zpick operations.
pub type Result<T> = std::result::Result<T, PickError>;
