//! Run configuration: classifier weights, rule prefixes, capacity ceilings.
//!
//! The whole configuration is one YAML document loaded once at startup and
//! treated as read-only afterwards. Classifiers and rules receive owned
//! copies of just the slice they need (see [`crate::classifier`] and
//! [`crate::rule`]), so nothing can observe a mutation mid-run.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::error::{PickError, Result};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PickerConfig {
    /// Default release when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    pub capacity: CapacityConfig,
    pub classifiers: ClassifierConfig,
    pub rules: RuleConfig,
    pub merge_window: MergeWindow,
}

impl PickerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PickerConfig = serde_yaml::from_str(content)
            .map_err(|e| PickError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a local configuration file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PickError::Config(format!("unable to read config file {:?}: {e}", path))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Reject structurally invalid configuration; warn about ambiguous parts.
    ///
    /// Duplicate group membership and overlapping priority ranges are legal
    /// (first match wins) but almost always a mistake, so they are logged.
    pub fn validate(&self) -> Result<()> {
        for range in &self.classifiers.pm_scores {
            if range.from > range.to {
                return Err(PickError::Config(format!(
                    "pmScores range [{}, {}] has from > to",
                    range.from, range.to
                )));
            }
        }

        let ranges = &self.classifiers.pm_scores;
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                if a.from <= b.to && b.from <= a.to {
                    warn!(
                        first_from = a.from,
                        first_to = a.to,
                        second_from = b.from,
                        second_to = b.to,
                        "overlapping pmScores ranges; the first listed range wins"
                    );
                }
            }
        }

        let mut owners: BTreeMap<String, &str> = BTreeMap::new();
        for group in &self.capacity.groups {
            for component in &group.components {
                let key = component.to_lowercase();
                if let Some(first) = owners.get(&key) {
                    warn!(
                        component = %key,
                        first_group = %first,
                        duplicate_group = %group.name,
                        "component listed in more than one capacity group; the first group wins"
                    );
                } else {
                    owners.insert(key, &group.name);
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// QE capacity for the release: per-group ceilings, a default per-component
/// ceiling and a global maximum.
///
/// Ceilings are unsigned. A ceiling of zero is a legitimate "never pick".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CapacityConfig {
    pub groups: Vec<ComponentGroup>,
    /// Total picks allowed regardless of component.
    pub max_total_picks: u32,
    /// Ceiling for components that belong to no group.
    pub max_default_picks_per_component: u32,
}

/// A named set of components sharing one ceiling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComponentGroup {
    pub name: String,
    pub capacity: u32,
    pub components: Vec<String>,
}

impl CapacityConfig {
    /// First group listing `component_key` (compared case-insensitively).
    pub fn group_for(&self, component_key: &str) -> Option<&ComponentGroup> {
        self.groups.iter().find(|g| {
            g.components
                .iter()
                .any(|c| c.eq_ignore_ascii_case(component_key))
        })
    }

    /// Pick ceiling that applies to `component_key`.
    pub fn ceiling_for(&self, component_key: &str) -> u32 {
        self.group_for(component_key)
            .map(|g| g.capacity)
            .unwrap_or(self.max_default_picks_per_component)
    }
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// Category → weight tables and the priority range table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    pub severities: BTreeMap<String, f32>,
    pub components: BTreeMap<String, f32>,
    pub keywords: BTreeMap<String, f32>,
    pub flags: BTreeMap<String, f32>,
    pub pm_scores: Vec<PriorityRange>,
}

/// Inclusive `[from, to]` interval of the numeric priority mapped to a weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriorityRange {
    pub from: i64,
    pub to: i64,
    pub score: f32,
}

impl PriorityRange {
    pub fn contains(&self, value: i64) -> bool {
        value >= self.from && value <= self.to
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConfig {
    pub pull_request_label: LabelRuleConfig,
}

/// Label prefixes that reject or are required, plus an optional severity
/// allow-list matched against `severity-<value>` labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelRuleConfig {
    pub refuse_on_label: Vec<String>,
    pub require_on_label: Vec<String>,
    pub allowed_severities: Vec<String>,
}

// ---------------------------------------------------------------------------
// Merge window
// ---------------------------------------------------------------------------

/// Optional date window (`YYYY-MM-DD`) during which picks are merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl MergeWindow {
    /// Whether `today` falls in `[from, to)`.
    ///
    /// A window missing either bound is always open. An unparseable `from`
    /// imposes no lower bound; an unparseable `to` closes the window.
    pub fn is_open(&self, today: NaiveDate) -> bool {
        let (from, to) = match (self.from.as_deref(), self.to.as_deref()) {
            (Some(f), Some(t)) if !f.is_empty() && !t.is_empty() => (f, t),
            _ => return true,
        };

        let after_from = match NaiveDate::parse_from_str(from, "%Y-%m-%d") {
            Ok(d) => today >= d,
            Err(e) => {
                warn!(value = %from, error = %e, "invalid merge window 'from' date, expected YYYY-MM-DD");
                true
            }
        };
        let before_to = match NaiveDate::parse_from_str(to, "%Y-%m-%d") {
            Ok(d) => today < d,
            Err(e) => {
                warn!(value = %to, error = %e, "invalid merge window 'to' date, expected YYYY-MM-DD");
                false
            }
        };

        after_from && before_to
    }
}
