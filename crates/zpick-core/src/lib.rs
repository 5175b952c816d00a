//! zpick core library
//!
//! Scores candidate backport pull requests, filters them through admission
//! rules and allocates a limited QE capacity across components, producing
//! the Decision List a release manager reviews.

pub mod allocation;
pub mod capacity;
pub mod classifier;
pub mod config;
pub mod decision_list;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod rule;
pub mod scoring;
pub mod source;
pub mod telemetry;

pub use domain::{
    component_key, Candidate, Decision, DecisionEntry, DefectRecord, EnrichedCandidate, PickError,
    Result, ScoredCandidate,
};

pub use allocation::{
    run_release, AllocationOptions, AllocationOutcome, AllocationPipeline, REJECTED_COMPONENT,
};
pub use capacity::{CapacityTracker, ComponentMetric, ComponentTally};
pub use classifier::{
    Classifier, ComponentClassifier, CompositeClassifier, FlagClassifier, KeywordClassifier,
    PriorityScoreClassifier, SeverityClassifier,
};
pub use config::{
    CapacityConfig, ClassifierConfig, ComponentGroup, LabelRuleConfig, MergeWindow, PickerConfig,
    PriorityRange, RuleConfig,
};
pub use decision_list::{
    parse_decision_list, read_decision_list, render_decision_list, render_decision_table,
    render_metrics_table, write_decision_list, DecisionItem, DecisionList,
};
pub use rule::{CompositeRule, LabelRule, Rule, RuleVerdict};
pub use scoring::{ScoringPool, ScoringPoolConfig, ScoringProgress, MAX_WORKERS};
pub use source::{CandidateSource, DefectResolver};

pub use metrics::METRICS;
pub use obs::{
    allocation_span, emit_allocation_finished, emit_candidates_listed, emit_merge_window_closed,
    emit_rules_evaluated, emit_scoring_finished,
};
pub use telemetry::init_tracing;

/// zpick version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
