//! Process-wide counters for pick runs.
//!
//! Counters are bumped silently by the pipeline. Call [`PickMetrics::flush`]
//! at the end of a run to emit them as one `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::decision::Decision;

/// Global metrics singleton.
pub static METRICS: PickMetrics = PickMetrics::new();

pub struct PickMetrics {
    candidates_scored: AtomicU64,
    candidates_rejected: AtomicU64,
    picks: AtomicU64,
    skips: AtomicU64,
}

impl Default for PickMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PickMetrics {
    pub const fn new() -> Self {
        Self {
            candidates_scored: AtomicU64::new(0),
            candidates_rejected: AtomicU64::new(0),
            picks: AtomicU64::new(0),
            skips: AtomicU64::new(0),
        }
    }

    pub fn inc_scored(&self) {
        self.candidates_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_scored", "counter incremented");
    }

    pub fn inc_rejected(&self) {
        self.candidates_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_rejected", "counter incremented");
    }

    /// Count one final decision.
    pub fn record_decision(&self, decision: Decision) {
        match decision {
            Decision::Pick => self.picks.fetch_add(1, Ordering::Relaxed),
            Decision::Skip => self.skips.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            candidates_scored = self.candidates_scored(),
            candidates_rejected = self.candidates_rejected(),
            picks = self.picks(),
            skips = self.skips(),
        );
    }

    pub fn candidates_scored(&self) -> u64 {
        self.candidates_scored.load(Ordering::Relaxed)
    }

    pub fn candidates_rejected(&self) -> u64 {
        self.candidates_rejected.load(Ordering::Relaxed)
    }

    pub fn picks(&self) -> u64 {
        self.picks.load(Ordering::Relaxed)
    }

    pub fn skips(&self) -> u64 {
        self.skips.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.candidates_scored.store(0, Ordering::Relaxed);
        self.candidates_rejected.store(0, Ordering::Relaxed);
        self.picks.store(0, Ordering::Relaxed);
        self.skips.store(0, Ordering::Relaxed);
    }
}
