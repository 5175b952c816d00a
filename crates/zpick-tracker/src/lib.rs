//! zpick-tracker: GitHub and Bugzilla collaborators
//!
//! Implements the [`zpick_core::CandidateSource`] and
//! [`zpick_core::DefectResolver`] seams over the GitHub search API and the
//! Bugzilla REST API, and loads the planner configuration from a file or URL.
//! Transport failures are fatal for a run and surface as
//! [`zpick_core::PickError::Transport`].

pub mod bugzilla;
pub mod config_source;
pub mod error;
pub mod github;

pub use bugzilla::{decode_bug, BugzillaClient, BugzillaConfig, DEFAULT_BUGZILLA_URL};
pub use config_source::{fetch_config, is_remote};
pub use error::TrackerError;
pub use github::{GithubConfig, GithubLister, DEFAULT_API_URL, DEFAULT_QUERY_TEMPLATE};

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
