//! Classifier set: independent score contributions summed into one score.
//!
//! Every classifier looks at exactly one facet of the resolved defect and
//! returns a weight from its own table. A facet with no configured weight
//! contributes `0.0`; that is never an error. Weights may be negative to
//! penalise a candidate, and the composite sum is not normalised.

use std::collections::BTreeMap;

use crate::config::{ClassifierConfig, PriorityRange};
use crate::domain::candidate::EnrichedCandidate;

/// A single scoring factor.
pub trait Classifier: Send + Sync {
    fn score(&self, candidate: &EnrichedCandidate) -> f32;
}

/// Lower-case the keys of a weight table once, at construction.
fn lowercase_keys(weights: &BTreeMap<String, f32>) -> BTreeMap<String, f32> {
    weights
        .iter()
        .map(|(k, v)| (k.to_lowercase(), *v))
        .collect()
}

/// Highest weight among `names` that appear in `weights`; `0.0` when none do.
///
/// A lone negative match keeps its sign.
fn highest_match<'a>(weights: &BTreeMap<String, f32>, names: impl Iterator<Item = &'a String>) -> f32 {
    names
        .filter_map(|n| weights.get(n).copied())
        .reduce(f32::max)
        .unwrap_or(0.0)
}

/// Weight by defect severity (case-insensitive).
#[derive(Debug, Clone)]
pub struct SeverityClassifier {
    weights: BTreeMap<String, f32>,
}

impl SeverityClassifier {
    pub fn new(weights: &BTreeMap<String, f32>) -> Self {
        Self {
            weights: lowercase_keys(weights),
        }
    }
}

impl Classifier for SeverityClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        self.weights
            .get(&candidate.defect.severity.to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Weight by the primary (first) component of the defect, case-insensitive.
///
/// Some components are more critical to keep the platform running than
/// others.
#[derive(Debug, Clone)]
pub struct ComponentClassifier {
    weights: BTreeMap<String, f32>,
}

impl ComponentClassifier {
    pub fn new(weights: &BTreeMap<String, f32>) -> Self {
        Self {
            weights: lowercase_keys(weights),
        }
    }
}

impl Classifier for ComponentClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        candidate
            .defect
            .primary_component()
            .and_then(|c| self.weights.get(&c.to_lowercase()))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Highest weight among the defect's keywords.
///
/// Matching keywords are not summed: only the most important one counts.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    weights: BTreeMap<String, f32>,
}

impl KeywordClassifier {
    pub fn new(weights: &BTreeMap<String, f32>) -> Self {
        Self {
            weights: weights.clone(),
        }
    }
}

impl Classifier for KeywordClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        highest_match(&self.weights, candidate.defect.keywords.iter())
    }
}

/// Highest weight among the defect's tracker flags (same rule as keywords).
#[derive(Debug, Clone)]
pub struct FlagClassifier {
    weights: BTreeMap<String, f32>,
}

impl FlagClassifier {
    pub fn new(weights: &BTreeMap<String, f32>) -> Self {
        Self {
            weights: weights.clone(),
        }
    }
}

impl Classifier for FlagClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        highest_match(&self.weights, candidate.defect.flags.iter())
    }
}

/// Weight by the product-management priority, via the first matching range.
#[derive(Debug, Clone)]
pub struct PriorityScoreClassifier {
    ranges: Vec<PriorityRange>,
}

impl PriorityScoreClassifier {
    pub fn new(ranges: &[PriorityRange]) -> Self {
        Self {
            ranges: ranges.to_vec(),
        }
    }
}

impl Classifier for PriorityScoreClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        let Ok(value) = candidate.defect.priority.trim().parse::<i64>() else {
            return 0.0;
        };
        self.ranges
            .iter()
            .find(|r| r.contains(value))
            .map(|r| r.score)
            .unwrap_or(0.0)
    }
}

/// Sums an ordered list of classifiers.
pub struct CompositeClassifier {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl CompositeClassifier {
    pub fn new(classifiers: Vec<Box<dyn Classifier>>) -> Self {
        Self { classifiers }
    }

    /// The standard set: severity, component, keywords, flags, priority.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(vec![
            Box::new(SeverityClassifier::new(&config.severities)),
            Box::new(ComponentClassifier::new(&config.components)),
            Box::new(KeywordClassifier::new(&config.keywords)),
            Box::new(FlagClassifier::new(&config.flags)),
            Box::new(PriorityScoreClassifier::new(&config.pm_scores)),
        ])
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

impl Classifier for CompositeClassifier {
    fn score(&self, candidate: &EnrichedCandidate) -> f32 {
        self.classifiers.iter().map(|c| c.score(candidate)).sum()
    }
}
