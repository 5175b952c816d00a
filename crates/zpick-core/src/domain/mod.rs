//! Domain model: candidates, defects, decisions and the error taxonomy.

pub mod candidate;
pub mod decision;
pub mod error;

pub use candidate::{
    component_key, Candidate, DefectRecord, EnrichedCandidate, ScoredCandidate,
};
pub use decision::{Decision, DecisionEntry};
pub use error::{PickError, Result};
