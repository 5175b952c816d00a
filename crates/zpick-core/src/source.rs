//! Collaborator seams: where candidates and defect metadata come from.
//!
//! Production implementations live in `zpick-tracker`; tests use the
//! in-memory fakes in [`crate::fakes`].

use async_trait::async_trait;

use crate::domain::candidate::{Candidate, DefectRecord, EnrichedCandidate};
use crate::domain::error::Result;

/// Lists candidate pull requests for a release.
///
/// Returns open items not yet approved for the release; may be empty.
/// Network or auth failures are fatal and come back as
/// [`PickError::Transport`](crate::PickError::Transport).
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn list_candidates(&self, release: &str) -> Result<Vec<Candidate>>;
}

/// Resolves the defect linked to a candidate.
///
/// Called at most once per admitted candidate; the result is memoized on
/// the returned [`EnrichedCandidate`].
#[async_trait]
pub trait DefectResolver: Send + Sync {
    async fn resolve_defect(&self, defect_id: u64) -> Result<DefectRecord>;

    async fn resolve(&self, candidate: Candidate) -> Result<EnrichedCandidate> {
        let defect = self.resolve_defect(candidate.defect_id).await?;
        Ok(EnrichedCandidate::new(candidate, defect))
    }
}
