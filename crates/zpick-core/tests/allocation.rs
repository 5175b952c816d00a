use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use zpick_core::fakes::{MemoryCandidateSource, MemoryDefectResolver};
use zpick_core::{
    read_decision_list, run_release, write_decision_list, AllocationOptions, AllocationPipeline,
    Candidate, Classifier, CompositeClassifier, CompositeRule, Decision, DefectRecord,
    EnrichedCandidate, PickError, PickerConfig, ScoringPool, ScoringPoolConfig,
    REJECTED_COMPONENT,
};

const CONFIG: &str = r#"
capacity:
  maxTotalPicks: 5
  maxDefaultPicksPerComponent: 3
  groups:
    - name: storage
      capacity: 2
      components: ["storage"]
    - name: frozen
      capacity: 0
      components: ["installer"]
classifiers:
  severities: {urgent: 1.0, high: 0.6, medium: 0.3, low: 0.1, unknown: -1.0}
  components: {networking: 0.5}
  keywords: {UpgradeBlocker: 0.25}
  pmScores:
    - {from: 100, to: 1000000, score: 0.7}
rules:
  pullRequestLabel:
    refuseOnLabel: ["do-not-merge/"]
"#;

fn config() -> PickerConfig {
    PickerConfig::from_yaml_str(CONFIG).expect("test config parses")
}

fn defect(id: u64, severity: &str, component: &str, priority: &str) -> DefectRecord {
    DefectRecord {
        id,
        summary: format!("defect {id}"),
        severity: severity.to_string(),
        component: component.split('/').map(str::to_string).collect(),
        priority: priority.to_string(),
        ..Default::default()
    }
}

fn candidate(id: u64) -> Candidate {
    Candidate::new(id, format!("https://github.com/openshift/origin/pull/{id}"), 10_000 + id)
        .with_title(format!("Bug {}: fix", 10_000 + id))
}

/// Candidate `id` linked to a defect with the given attributes.
fn seeded(
    resolver: MemoryDefectResolver,
    id: u64,
    severity: &str,
    component: &str,
    priority: &str,
) -> (MemoryDefectResolver, Candidate) {
    let resolver = resolver.with_defect(defect(10_000 + id, severity, component, priority));
    (resolver, candidate(id))
}

fn pipeline(config: &PickerConfig, resolver: Arc<MemoryDefectResolver>) -> AllocationPipeline {
    AllocationPipeline::from_config(
        config,
        resolver,
        ScoringPoolConfig { workers: 3 },
        AllocationOptions::default(),
    )
}

/// A mixed batch touching every branch of the capacity walk.
fn mixed_batch() -> (Arc<MemoryDefectResolver>, Vec<Candidate>) {
    let specs = [
        (1, "urgent", "Networking", "120"),
        (2, "high", "storage", "10"),
        (3, "urgent", "storage", "150"),
        (4, "medium", "Storage", "5"),
        (5, "unknown", "apiserver", "200"),
        (6, "low", "installer", ""),
        (7, "high", "apiserver", "abc"),
        (8, "medium", "etcd", "101"),
        (9, "low", "monitoring", "1"),
        (10, "urgent", "node/kubelet", "99"),
    ];
    let mut resolver = MemoryDefectResolver::new();
    let mut candidates = Vec::new();
    for (id, severity, component, priority) in specs {
        let (r, c) = seeded(resolver, id, severity, component, priority);
        resolver = r;
        candidates.push(c);
    }
    candidates.push(candidate(11).with_label("do-not-merge/hold"));
    (Arc::new(resolver), candidates)
}

#[tokio::test]
async fn composite_score_scenario_is_picked() {
    let (resolver, c) = seeded(MemoryDefectResolver::new(), 1, "urgent", "networking", "120");
    let outcome = pipeline(&config(), Arc::new(resolver))
        .allocate(vec![c], &CancellationToken::new())
        .await
        .unwrap();
    let entry = outcome.decisions.entries().next().unwrap();
    assert!((entry.score - 2.2).abs() < 1e-5);
    assert_eq!(entry.decision, Decision::Pick);
    assert_eq!(entry.decision_reason, "picked for z-stream with score 2.20");
}

#[tokio::test]
async fn component_ceiling_skips_the_overflow() {
    let mut resolver = MemoryDefectResolver::new();
    let mut candidates = Vec::new();
    for (id, severity) in [(1, "urgent"), (2, "high"), (3, "medium")] {
        let (r, c) = seeded(resolver, id, severity, "storage", "");
        resolver = r;
        candidates.push(c);
    }
    let outcome = pipeline(&config(), Arc::new(resolver))
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();

    let entries: Vec<_> = outcome.decisions.entries().collect();
    assert_eq!(entries.iter().filter(|e| e.decision.is_pick()).count(), 2);
    let skipped: Vec<_> = entries.iter().filter(|e| !e.decision.is_pick()).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].id, 3);
    assert!(skipped[0]
        .decision_reason
        .contains("maximum allowed picks for component storage is 2"));
}

#[tokio::test]
async fn global_ceiling_skips_the_sixth_ranked() {
    let mut resolver = MemoryDefectResolver::new();
    let mut candidates = Vec::new();
    let specs = [
        (1, "urgent", "a"),
        (2, "high", "b"),
        (3, "medium", "c"),
        (4, "low", "d"),
        (5, "urgent", "e"),
        (6, "low", "f"),
    ];
    for (id, severity, component) in specs {
        let (r, c) = seeded(resolver, id, severity, component, "");
        resolver = r;
        candidates.push(c);
    }
    let outcome = pipeline(&config(), Arc::new(resolver))
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.total_picks, 5);
    let last = outcome.decisions.entries().last().unwrap();
    assert_eq!(last.id, 6);
    assert_eq!(last.decision, Decision::Skip);
    assert!(last.decision_reason.contains("global capacity exceeded"));
    assert!(last.decision_reason.contains("5 picks"));
}

#[tokio::test]
async fn refused_label_is_skipped_without_resolution() {
    let (resolver, admitted) = seeded(MemoryDefectResolver::new(), 1, "urgent", "etcd", "");
    let resolver = Arc::new(resolver.with_defect(defect(10_002, "urgent", "etcd", "500")));
    let refused = candidate(2).with_label("lgtm").with_label("do-not-merge/hold");

    let outcome = pipeline(&config(), resolver.clone())
        .allocate(vec![admitted, refused], &CancellationToken::new())
        .await
        .unwrap();

    let first = outcome.decisions.entries().next().unwrap();
    assert_eq!(first.id, 2);
    assert_eq!(first.decision, Decision::Skip);
    assert_eq!(first.score, 0.0);
    assert!(first.decision_reason.contains("do-not-merge/hold"));
    assert!(first.component.is_none());
    assert_eq!(resolver.calls_for(10_002), 0);
    assert_eq!(resolver.calls_for(10_001), 1);
    assert_eq!(outcome.rejected, 1);
    assert!(outcome
        .metrics
        .iter()
        .any(|m| m.component == REJECTED_COMPONENT && m.skips == 1));
}

/// Delegates to the configured classifiers and records which pull requests
/// it was asked to score.
struct CountingClassifier {
    inner: CompositeClassifier,
    calls: AtomicUsize,
    seen: std::sync::Mutex<Vec<u64>>,
}

impl Classifier for CountingClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(candidate.candidate.id);
        self.inner.score(candidate)
    }
}

#[tokio::test]
async fn refused_candidates_are_never_classified() {
    let config = config();
    let (resolver, candidates) = mixed_batch();
    let classifier = Arc::new(CountingClassifier {
        inner: CompositeClassifier::from_config(&config.classifiers),
        calls: AtomicUsize::new(0),
        seen: std::sync::Mutex::new(Vec::new()),
    });
    let pool = ScoringPool::new(classifier.clone(), resolver, ScoringPoolConfig { workers: 3 });
    let pipeline = AllocationPipeline::new(
        Arc::new(CompositeRule::from_config(&config.rules)),
        pool,
        config.capacity.clone(),
        AllocationOptions::default(),
    );

    let outcome = pipeline
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.rejected, 1);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 10);
    assert!(!classifier.seen.lock().unwrap().contains(&11));
}

#[tokio::test]
async fn negative_score_skips_even_with_capacity() {
    let (resolver, c) = seeded(MemoryDefectResolver::new(), 1, "unknown", "apiserver", "");
    let outcome = pipeline(&config(), Arc::new(resolver))
        .allocate(vec![c], &CancellationToken::new())
        .await
        .unwrap();
    let entry = outcome.decisions.entries().next().unwrap();
    assert_eq!(entry.decision, Decision::Skip);
    assert!(entry.decision_reason.contains("negative score"));
    assert_eq!(outcome.total_picks, 0);
}

#[tokio::test]
async fn zero_ceiling_component_is_never_picked() {
    let (resolver, c) = seeded(MemoryDefectResolver::new(), 1, "urgent", "installer", "500");
    let outcome = pipeline(&config(), Arc::new(resolver))
        .allocate(vec![c], &CancellationToken::new())
        .await
        .unwrap();
    let entry = outcome.decisions.entries().next().unwrap();
    assert_eq!(entry.decision, Decision::Skip);
    assert!(entry.decision_reason.contains("installer is 0"));
}

#[tokio::test]
async fn mixed_batch_honours_every_invariant() {
    let config = config();
    let (resolver, candidates) = mixed_batch();
    let input_len = candidates.len();
    let outcome = pipeline(&config, resolver.clone())
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();
    let entries: Vec<_> = outcome.decisions.entries().collect();

    // Nothing dropped or duplicated.
    assert_eq!(entries.len(), input_len);
    let mut ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), input_len);

    for e in &entries {
        if e.score < 0.0 {
            assert_eq!(e.decision, Decision::Skip);
        }
    }

    let mut picks_per_component: HashMap<String, u32> = HashMap::new();
    for e in entries.iter().filter(|e| e.decision.is_pick()) {
        *picks_per_component
            .entry(e.component.clone().unwrap_or_default())
            .or_default() += 1;
    }
    for (component, picks) in &picks_per_component {
        assert!(
            *picks <= config.capacity.ceiling_for(component),
            "{component} picked {picks} times"
        );
    }

    let total_picks = entries.iter().filter(|e| e.decision.is_pick()).count();
    assert!(total_picks <= config.capacity.max_total_picks as usize);
    assert_eq!(total_picks, outcome.total_picks);

    // Rule rejections lead, then admitted entries in descending score.
    assert_eq!(entries[0].id, 11);
    let admitted_scores: Vec<f32> = entries[outcome.rejected..].iter().map(|e| e.score).collect();
    assert!(admitted_scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn allocation_is_idempotent() {
    let config = config();
    let (resolver, candidates) = mixed_batch();
    let pipeline = pipeline(&config, resolver);
    let cancel = CancellationToken::new();
    let first = pipeline.allocate(candidates.clone(), &cancel).await.unwrap();
    let second = pipeline.allocate(candidates, &cancel).await.unwrap();
    assert_eq!(first.decisions, second.decisions);
    assert_eq!(first.metrics, second.metrics);
}

#[tokio::test]
async fn capacity_percent_scales_the_global_ceiling() {
    let config = config();
    let (resolver, candidates) = mixed_batch();
    let pipeline = AllocationPipeline::from_config(
        &config,
        resolver,
        ScoringPoolConfig::default(),
        AllocationOptions {
            use_capacity_percent: 50,
        },
    );
    assert_eq!(pipeline.effective_max_total(), 2);
    let outcome = pipeline
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.total_picks, 2);
}

#[tokio::test]
async fn run_release_lists_then_allocates() {
    let (resolver, candidates) = mixed_batch();
    let source = MemoryCandidateSource::new().with_release("4.7", candidates);
    let outcome = run_release(
        &source,
        "4.7",
        &pipeline(&config(), resolver),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.decisions.len(), 11);

    let empty = run_release(
        &source,
        "4.6",
        &pipeline(&config(), Arc::new(MemoryDefectResolver::new())),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(empty.decisions.is_empty());
}

#[tokio::test]
async fn unreachable_source_aborts_before_any_decision() {
    let resolver = Arc::new(MemoryDefectResolver::new());
    let err = run_release(
        &MemoryCandidateSource::unreachable(),
        "4.7",
        &pipeline(&config(), resolver.clone()),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PickError::Transport(_)));
    assert_eq!(resolver.total_calls(), 0);
}

#[tokio::test]
async fn unresolvable_defect_fails_the_run() {
    let err = pipeline(&config(), Arc::new(MemoryDefectResolver::new()))
        .allocate(vec![candidate(1)], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PickError::Transport(_)));
}

#[tokio::test]
async fn cancelled_run_produces_no_decisions() {
    let (resolver, candidates) = mixed_batch();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline(&config(), resolver)
        .allocate(candidates, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, PickError::Cancelled));
}

#[tokio::test]
async fn decision_list_survives_a_file_round_trip() {
    let (resolver, candidates) = mixed_batch();
    let outcome = pipeline(&config(), resolver)
        .allocate(candidates, &CancellationToken::new())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("candidates.yaml");
    write_decision_list(&path, &outcome.decisions).unwrap();
    let read_back = read_decision_list(&path).unwrap();
    assert_eq!(read_back, outcome.decisions);
    assert_eq!(read_back.picks().count(), outcome.total_picks);
}
