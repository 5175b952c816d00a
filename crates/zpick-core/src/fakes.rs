//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryCandidateSource` and `MemoryDefectResolver`, which satisfy
//! the trait contracts without touching the network. The resolver counts
//! calls per defect so tests can prove which candidates were resolved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::candidate::{Candidate, DefectRecord};
use crate::domain::error::{PickError, Result};
use crate::source::{CandidateSource, DefectResolver};

// ---------------------------------------------------------------------------
// MemoryCandidateSource
// ---------------------------------------------------------------------------

/// Candidate source returning a fixed list per release.
#[derive(Debug, Default)]
pub struct MemoryCandidateSource {
    releases: HashMap<String, Vec<Candidate>>,
    unreachable: bool,
}

impl MemoryCandidateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, release: &str, candidates: Vec<Candidate>) -> Self {
        self.releases.insert(release.to_string(), candidates);
        self
    }

    /// Every call fails with a transport error.
    pub fn unreachable() -> Self {
        Self {
            releases: HashMap::new(),
            unreachable: true,
        }
    }
}

#[async_trait]
impl CandidateSource for MemoryCandidateSource {
    async fn list_candidates(&self, release: &str) -> Result<Vec<Candidate>> {
        if self.unreachable {
            return Err(PickError::Transport(format!(
                "candidate source unreachable for release {release}"
            )));
        }
        Ok(self.releases.get(release).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryDefectResolver
// ---------------------------------------------------------------------------

/// Defect resolver backed by a `HashMap<defect_id, DefectRecord>`.
///
/// Unknown ids fail with a transport error, like an unreachable tracker.
#[derive(Debug, Default)]
pub struct MemoryDefectResolver {
    defects: HashMap<u64, DefectRecord>,
    calls: Mutex<HashMap<u64, usize>>,
    total_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryDefectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defect(mut self, defect: DefectRecord) -> Self {
        self.defects.insert(defect.id, defect);
        self
    }

    /// Sleep this long inside every resolution (simulates a slow tracker).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `defect_id` was resolved.
    pub fn calls_for(&self, defect_id: u64) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&defect_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefectResolver for MemoryDefectResolver {
    async fn resolve_defect(&self, defect_id: u64) -> Result<DefectRecord> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(defect_id)
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.defects
            .get(&defect_id)
            .cloned()
            .ok_or_else(|| PickError::Transport(format!("defect {defect_id} could not be fetched")))
    }
}
