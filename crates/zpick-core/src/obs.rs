//! Structured lifecycle events for a pick run.
//!
//! Every event carries an `event` field so log pipelines can filter on it,
//! e.g. `event=allocation.finished`.

use tracing::{info, warn, Span};

/// Span tagging everything logged while planning `release`.
///
/// Attach it to async work with `tracing::Instrument::instrument`.
pub fn allocation_span(release: &str) -> Span {
    tracing::info_span!("zpick.allocation", release = %release)
}

pub fn emit_candidates_listed(release: &str, count: usize) {
    info!(event = "candidates.listed", release = %release, count = count);
}

pub fn emit_rules_evaluated(total: usize, rejected: usize) {
    info!(
        event = "rules.evaluated",
        total = total,
        admitted = total - rejected,
        rejected = rejected,
        "{} pull requests refused by the rules",
        rejected
    );
}

pub fn emit_scoring_finished(scored: usize, workers: usize, duration_ms: u64) {
    info!(
        event = "scoring.finished",
        scored = scored,
        workers = workers,
        duration_ms = duration_ms,
    );
}

pub fn emit_allocation_finished(picks: usize, skips: usize, max_total_picks: u32) {
    info!(
        event = "allocation.finished",
        picks = picks,
        skips = skips,
        max_total_picks = max_total_picks,
    );
}

/// The configured merge window does not include today.
pub fn emit_merge_window_closed(from: Option<&str>, to: Option<&str>) {
    warn!(
        event = "merge_window.closed",
        from = from.unwrap_or(""),
        to = to.unwrap_or(""),
        "merge window is closed; the plan is produced for review only"
    );
}
