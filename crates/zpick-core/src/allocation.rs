//! Allocation pipeline: rule gate, scoring, ordering and the capacity walk.
//!
//! Stages run strictly in sequence. Only scoring is concurrent, and the
//! capacity walk starts after the scoring barrier, so the walk is the sole
//! owner of the [`CapacityTracker`].

use std::cmp::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, Instrument};

use crate::capacity::{CapacityTracker, ComponentMetric};
use crate::classifier::CompositeClassifier;
use crate::config::{CapacityConfig, PickerConfig};
use crate::decision_list::DecisionList;
use crate::domain::candidate::{Candidate, ScoredCandidate};
use crate::domain::decision::{Decision, DecisionEntry};
use crate::domain::error::{PickError, Result};
use crate::metrics::METRICS;
use crate::obs::{
    allocation_span, emit_allocation_finished, emit_candidates_listed, emit_rules_evaluated,
};
use crate::rule::{CompositeRule, Rule};
use crate::scoring::{ScoringPool, ScoringPoolConfig, ScoringProgress};
use crate::source::{CandidateSource, DefectResolver};

/// Metrics key for candidates refused by the rules. Their defects are never
/// resolved, so their real component is unknown.
pub const REJECTED_COMPONENT: &str = "(rejected)";

/// Run-level knobs that are not part of the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationOptions {
    /// Share of `maxTotalPicks` to use for this run, 0..=100.
    pub use_capacity_percent: u8,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        Self {
            use_capacity_percent: 100,
        }
    }
}

impl AllocationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.use_capacity_percent > 100 {
            return Err(PickError::Config(format!(
                "use-capacity-percent must be between 0 and 100, got {}",
                self.use_capacity_percent
            )));
        }
        Ok(())
    }

    /// `floor(max_total_picks * use_capacity_percent / 100)`.
    pub fn effective_max_total(&self, max_total_picks: u32) -> u32 {
        (u64::from(max_total_picks) * u64::from(self.use_capacity_percent) / 100) as u32
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    /// Rule rejections first, then admitted candidates by descending score.
    pub decisions: DecisionList,
    /// Per-component tallies sorted by component key.
    pub metrics: Vec<ComponentMetric>,
    /// Candidates refused by the rules.
    pub rejected: usize,
    pub total_picks: usize,
}

pub struct AllocationPipeline {
    rules: Arc<dyn Rule>,
    pool: ScoringPool,
    capacity: CapacityConfig,
    options: AllocationOptions,
}

impl AllocationPipeline {
    pub fn new(
        rules: Arc<dyn Rule>,
        pool: ScoringPool,
        capacity: CapacityConfig,
        options: AllocationOptions,
    ) -> Self {
        Self {
            rules,
            pool,
            capacity,
            options,
        }
    }

    /// Wire the standard rule and classifier sets from a loaded configuration.
    pub fn from_config(
        config: &PickerConfig,
        resolver: Arc<dyn DefectResolver>,
        pool_config: ScoringPoolConfig,
        options: AllocationOptions,
    ) -> Self {
        let classifier = Arc::new(CompositeClassifier::from_config(&config.classifiers));
        let pool = ScoringPool::new(classifier, resolver, pool_config);
        Self::new(
            Arc::new(CompositeRule::from_config(&config.rules)),
            pool,
            config.capacity.clone(),
            options,
        )
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScoringProgress) + Send + Sync + 'static,
    {
        self.pool = self.pool.with_progress(callback);
        self
    }

    /// Global pick ceiling after applying the capacity percentage.
    pub fn effective_max_total(&self) -> u32 {
        self.options
            .effective_max_total(self.capacity.max_total_picks)
    }

    /// Turn a candidate list into the ordered decision list.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn allocate(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<AllocationOutcome> {
        self.options.validate()?;
        let total = candidates.len();
        let mut tracker = CapacityTracker::new(&self.capacity);
        let mut entries = Vec::with_capacity(total);

        let mut admitted = Vec::new();
        for candidate in candidates {
            let verdict = self.rules.evaluate(&candidate);
            if verdict.admitted {
                admitted.push(candidate);
                continue;
            }
            debug!(url = %candidate.url, reasons = %verdict.joined_reasons(), "candidate refused");
            METRICS.inc_rejected();
            METRICS.record_decision(Decision::Skip);
            tracker.record(REJECTED_COMPONENT, Decision::Skip);
            entries.push(DecisionEntry {
                url: candidate.url,
                id: candidate.id,
                bug: candidate.defect_id,
                decision: Decision::Skip,
                decision_reason: verdict.joined_reasons(),
                score: 0.0,
                summary: None,
                component: None,
                severity: None,
                pm_score: None,
            });
        }
        let rejected = entries.len();
        emit_rules_evaluated(total, rejected);

        let mut scored = self.pool.score_all(admitted, cancel).await?;
        scored.sort_by(rank);

        let max_total = self.effective_max_total();
        info!(
            percent = self.options.use_capacity_percent,
            max_total_picks = self.capacity.max_total_picks,
            effective = max_total,
            "using {}% of total QE capacity",
            self.options.use_capacity_percent
        );

        let mut total_picks = 0usize;
        for item in scored {
            let key = item.enriched.defect.component_key();
            tracker.increment(&key);

            let (mut decision, mut reason) = if item.score < 0.0 {
                (
                    Decision::Skip,
                    format!(
                        "automated classifiers gave this PR a negative score ({:.2}); it does not meet the merge criteria for this release",
                        item.score
                    ),
                )
            } else if !tracker.has_capacity(&key) {
                (
                    Decision::Skip,
                    format!(
                        "component capacity exceeded: maximum allowed picks for component {} is {}",
                        key,
                        tracker.ceiling(&key)
                    ),
                )
            } else {
                (
                    Decision::Pick,
                    format!("picked for z-stream with score {:.2}", item.score),
                )
            };

            if decision.is_pick() {
                if total_picks as u64 >= u64::from(max_total) {
                    decision = Decision::Skip;
                    reason = format!(
                        "global capacity exceeded: maximum QE capacity for this z-stream is {} picks",
                        max_total
                    );
                } else {
                    total_picks += 1;
                }
            }

            tracker.record(&key, decision);
            METRICS.record_decision(decision);
            entries.push(entry_for(item, key, decision, reason));
        }

        let outcome = AllocationOutcome {
            decisions: DecisionList::new(entries),
            metrics: tracker.metrics(),
            rejected,
            total_picks,
        };
        emit_allocation_finished(
            outcome.total_picks,
            outcome.decisions.len() - outcome.total_picks,
            max_total,
        );
        Ok(outcome)
    }
}

/// Score descending, then id, then url; a total order.
fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    let (ca, cb) = (&a.enriched.candidate, &b.enriched.candidate);
    b.score
        .total_cmp(&a.score)
        .then_with(|| ca.id.cmp(&cb.id))
        .then_with(|| ca.url.cmp(&cb.url))
}

fn entry_for(item: ScoredCandidate, component: String, decision: Decision, reason: String) -> DecisionEntry {
    let ScoredCandidate { enriched, score } = item;
    let defect = enriched.defect;
    DecisionEntry {
        url: enriched.candidate.url,
        id: enriched.candidate.id,
        bug: enriched.candidate.defect_id,
        decision,
        decision_reason: reason,
        score,
        summary: Some(defect.summary),
        component: Some(component),
        severity: Some(defect.severity),
        pm_score: Some(defect.priority),
    }
}

/// List the release's candidates and allocate them.
///
/// A failure to list is fatal and happens before any decision is made.
pub async fn run_release(
    source: &dyn CandidateSource,
    release: &str,
    pipeline: &AllocationPipeline,
    cancel: &CancellationToken,
) -> Result<AllocationOutcome> {
    async {
        let candidates = source.list_candidates(release).await?;
        emit_candidates_listed(release, candidates.len());
        pipeline.allocate(candidates, cancel).await
    }
    .instrument(allocation_span(release))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::{DefectRecord, EnrichedCandidate};

    fn scored(id: u64, url: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            enriched: EnrichedCandidate::new(Candidate::new(id, url, id), DefectRecord::default()),
            score,
        }
    }

    #[test]
    fn effective_max_total_floors() {
        let opts = |p| AllocationOptions {
            use_capacity_percent: p,
        };
        assert_eq!(opts(100).effective_max_total(40), 40);
        assert_eq!(opts(50).effective_max_total(5), 2);
        assert_eq!(opts(0).effective_max_total(40), 0);
        assert!(opts(101).validate().is_err());
        assert!(AllocationOptions::default().validate().is_ok());
    }

    #[test]
    fn rank_breaks_ties_by_id_then_url() {
        let mut items = vec![
            scored(3, "b", 1.0),
            scored(9, "a", 2.0),
            scored(1, "z", 1.0),
            scored(1, "y", 1.0),
            scored(4, "c", -0.5),
        ];
        items.sort_by(rank);
        let order: Vec<(u64, &str)> = items
            .iter()
            .map(|s| (s.enriched.candidate.id, s.enriched.candidate.url.as_str()))
            .collect();
        assert_eq!(order, vec![(9, "a"), (1, "y"), (1, "z"), (3, "b"), (4, "c")]);
    }
}
