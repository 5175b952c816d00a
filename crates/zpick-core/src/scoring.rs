//! Bounded concurrent scoring.
//!
//! Resolving a candidate's defect is a slow, rate-limited remote call, so
//! scoring runs on a small fixed pool of tokio tasks. The tasks drain a
//! shared queue of candidate indices; each task keeps its own results and
//! hands them back when it finishes, so workers never share mutable output.
//! [`ScoringPool::score_all`] is the barrier: it returns only after every
//! candidate is scored, or with the first fatal error, never with a partial
//! result.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::classifier::Classifier;
use crate::domain::candidate::{Candidate, ScoredCandidate};
use crate::domain::error::{PickError, Result};
use crate::metrics::METRICS;
use crate::obs::emit_scoring_finished;
use crate::source::DefectResolver;

/// Upper bound on scoring workers; the defect tracker is rate-limited.
pub const MAX_WORKERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPoolConfig {
    /// Number of concurrent workers, clamped into `1..=MAX_WORKERS`.
    pub workers: usize,
}

impl Default for ScoringPoolConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Progress report delivered once per scored candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringProgress {
    pub completed: usize,
    pub total: usize,
}

type ProgressFn = Arc<dyn Fn(ScoringProgress) + Send + Sync>;
type Queue = Arc<Mutex<VecDeque<(usize, Candidate)>>>;

/// Scores candidates with a classifier on a bounded pool of workers.
pub struct ScoringPool {
    classifier: Arc<dyn Classifier>,
    resolver: Arc<dyn DefectResolver>,
    workers: usize,
    progress: Option<ProgressFn>,
}

impl ScoringPool {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        resolver: Arc<dyn DefectResolver>,
        config: ScoringPoolConfig,
    ) -> Self {
        Self {
            classifier,
            resolver,
            workers: config.workers.clamp(1, MAX_WORKERS),
            progress: None,
        }
    }

    /// Register a progress callback.
    ///
    /// The callback runs on the task awaiting [`score_all`](Self::score_all),
    /// never on a worker.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScoringProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve and score every candidate; output order equals input order.
    ///
    /// The first resolver error aborts the remaining work and is returned.
    /// Cancelling `cancel` aborts the remaining work with
    /// [`PickError::Cancelled`].
    #[instrument(skip_all, fields(candidates = candidates.len(), workers = self.workers))]
    pub async fn score_all(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredCandidate>> {
        let total = candidates.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        if cancel.is_cancelled() {
            return Err(PickError::Cancelled);
        }

        let started = Instant::now();
        let queue: Queue = Arc::new(Mutex::new(candidates.into_iter().enumerate().collect()));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();

        let mut join_set = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let queue = Arc::clone(&queue);
            let classifier = Arc::clone(&self.classifier);
            let resolver = Arc::clone(&self.resolver);
            let done_tx = done_tx.clone();

            join_set.spawn(async move {
                let mut scored: Vec<(usize, ScoredCandidate)> = Vec::new();
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((index, candidate)) = next else {
                        break;
                    };

                    let enriched = resolver.resolve(candidate).await?;
                    let score = classifier.score(&enriched);
                    debug!(
                        worker = worker,
                        url = %enriched.candidate.url,
                        score = score,
                        "candidate scored"
                    );
                    METRICS.inc_scored();
                    scored.push((index, ScoredCandidate { enriched, score }));
                    let _ = done_tx.send(());
                }
                Ok::<_, PickError>(scored)
            });
        }
        drop(done_tx);

        let mut slots: Vec<Option<ScoredCandidate>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    return Err(PickError::Cancelled);
                }
                Some(()) = done_rx.recv() => {
                    completed += 1;
                    self.report(completed, total);
                }
                joined = join_set.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(batch))) => {
                        for (index, scored) in batch {
                            slots[index] = Some(scored);
                        }
                    }
                    Some(Ok(Err(e))) => {
                        join_set.abort_all();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        join_set.abort_all();
                        return Err(PickError::Scoring(format!("scoring worker failed: {e}")));
                    }
                },
            }
        }

        while done_rx.try_recv().is_ok() {
            completed += 1;
            self.report(completed, total);
        }

        let scored = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    PickError::Scoring(format!("candidate at position {i} was never scored"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        emit_scoring_finished(
            scored.len(),
            self.workers,
            started.elapsed().as_millis() as u64,
        );
        Ok(scored)
    }

    fn report(&self, completed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(ScoringProgress { completed, total });
        }
    }
}
