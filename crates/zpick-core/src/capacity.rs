//! Per-component capacity accounting.
//!
//! The tracker is owned by the allocation walk and touched only
//! sequentially after scoring, so it needs no synchronization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CapacityConfig;
use crate::domain::decision::Decision;

/// Running tally for one component key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentTally {
    /// Candidates seen for this key (the capacity counter).
    pub visited: u32,
    pub picks: u32,
    pub skips: u32,
}

/// Per-component summary reported after a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentMetric {
    pub component: String,
    pub total: u32,
    pub picks: u32,
    pub skips: u32,
}

/// Counts candidates per component and answers whether a component is
/// still within its ceiling.
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    config: CapacityConfig,
    tallies: BTreeMap<String, ComponentTally>,
}

impl CapacityTracker {
    pub fn new(config: &CapacityConfig) -> Self {
        Self {
            config: config.clone(),
            tallies: BTreeMap::new(),
        }
    }

    /// Bump the counter for `key` and return the new count.
    pub fn increment(&mut self, key: &str) -> u32 {
        let tally = self.tallies.entry(key.to_string()).or_default();
        tally.visited += 1;
        tally.visited
    }

    /// Candidates counted so far for `key`.
    pub fn count(&self, key: &str) -> u32 {
        self.tallies.get(key).map(|t| t.visited).unwrap_or(0)
    }

    /// Ceiling applying to `key`: its group's capacity, else the default.
    pub fn ceiling(&self, key: &str) -> u32 {
        self.config.ceiling_for(key)
    }

    /// Whether `key` is within its ceiling. Meant to be called right after
    /// [`increment`](Self::increment), so the current candidate is counted.
    pub fn has_capacity(&self, key: &str) -> bool {
        self.count(key) <= self.ceiling(key)
    }

    /// Record the final decision for a candidate under `key`.
    ///
    /// Does not touch the capacity counter, so keys that never reach
    /// [`increment`](Self::increment) (rule rejections) can still be
    /// tallied.
    pub fn record(&mut self, key: &str, decision: Decision) {
        let tally = self.tallies.entry(key.to_string()).or_default();
        match decision {
            Decision::Pick => tally.picks += 1,
            Decision::Skip => tally.skips += 1,
        }
    }

    pub fn tally(&self, key: &str) -> ComponentTally {
        self.tallies.get(key).copied().unwrap_or_default()
    }

    /// Per-component summary, sorted by key.
    pub fn metrics(&self) -> Vec<ComponentMetric> {
        self.tallies
            .iter()
            .map(|(component, t)| ComponentMetric {
                component: component.clone(),
                total: t.picks + t.skips,
                picks: t.picks,
                skips: t.skips,
            })
            .collect()
    }
}
