//! Admission rules evaluated before scoring.
//!
//! A rule looks only at the lightweight [`Candidate`] (its tracker labels),
//! never at resolved defect data, so rejected candidates cost no defect
//! lookups. A [`CompositeRule`] runs every rule and keeps every reason so
//! the reviewer sees all causes of a rejection at once.

use serde::{Deserialize, Serialize};

use crate::config::LabelRuleConfig;
use crate::domain::candidate::Candidate;

/// Outcome of evaluating one or more rules against a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleVerdict {
    /// Human-readable reasons; empty when admitted.
    pub reasons: Vec<String>,
    pub admitted: bool,
}

impl RuleVerdict {
    pub fn admit() -> Self {
        Self {
            reasons: Vec::new(),
            admitted: true,
        }
    }

    pub fn reject(reasons: Vec<String>) -> Self {
        Self {
            reasons,
            admitted: false,
        }
    }

    /// Reasons joined for a single-line decision record.
    pub fn joined_reasons(&self) -> String {
        self.reasons.join(", ")
    }
}

/// A hard admit/reject predicate.
pub trait Rule: Send + Sync {
    fn evaluate(&self, candidate: &Candidate) -> RuleVerdict;
}

/// Refuse/require label prefixes plus an optional severity allow-list.
#[derive(Debug, Clone)]
pub struct LabelRule {
    config: LabelRuleConfig,
}

impl LabelRule {
    pub fn new(config: &LabelRuleConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn severity_admitted(&self, labels: &[String]) -> bool {
        labels.iter().any(|label| {
            let label = label.to_lowercase();
            self.config
                .allowed_severities
                .iter()
                .any(|s| label.ends_with(&format!("severity-{}", s.to_lowercase())))
        })
    }
}

impl Rule for LabelRule {
    fn evaluate(&self, candidate: &Candidate) -> RuleVerdict {
        let mut reasons = Vec::new();

        for label in &candidate.labels {
            if self
                .config
                .refuse_on_label
                .iter()
                .any(|prefix| label.starts_with(prefix.as_str()))
            {
                reasons.push(format!("skipping because {label:?} label found"));
            }
        }
        if !reasons.is_empty() {
            reasons.push(format!(
                "one or more labels prevented approval; any of the following labels precludes this PR from being approved: {:?}",
                self.config.refuse_on_label
            ));
        }

        for prefix in &self.config.require_on_label {
            if !candidate
                .labels
                .iter()
                .any(|label| label.starts_with(prefix.as_str()))
            {
                reasons.push(format!("skipping because required label {prefix:?} is missing"));
            }
        }

        if !self.config.allowed_severities.is_empty() && !self.severity_admitted(&candidate.labels) {
            reasons.push(format!(
                "skipping because severity is not one of {:?}",
                self.config.allowed_severities
            ));
        }

        if reasons.is_empty() {
            RuleVerdict::admit()
        } else {
            RuleVerdict::reject(reasons)
        }
    }
}

/// Admits only when every contained rule admits; aggregates all reasons.
pub struct CompositeRule {
    rules: Vec<Box<dyn Rule>>,
}

impl CompositeRule {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &crate::config::RuleConfig) -> Self {
        Self::new(vec![Box::new(LabelRule::new(&config.pull_request_label))])
    }
}

impl Rule for CompositeRule {
    fn evaluate(&self, candidate: &Candidate) -> RuleVerdict {
        let mut reasons = Vec::new();
        let mut admitted = true;
        for rule in &self.rules {
            let verdict = rule.evaluate(candidate);
            if !verdict.admitted {
                reasons.extend(verdict.reasons);
                admitted = false;
            }
        }
        RuleVerdict { reasons, admitted }
    }
}
