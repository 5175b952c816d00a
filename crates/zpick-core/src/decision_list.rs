//! The Decision List document and its text renderings.
//!
//! The document is YAML shaped as `items[].pullRequest`. Every item is
//! preceded by a `#` comment block so a reviewer can read the plan without
//! tooling; the comments are ignored when the document is parsed back.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capacity::ComponentMetric;
use crate::domain::decision::{Decision, DecisionEntry};
use crate::domain::error::Result;

/// Wrapper giving each entry its `pullRequest` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionItem {
    #[serde(rename = "pullRequest")]
    pub pull_request: DecisionEntry,
}

/// Ordered pick/skip verdicts for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionList {
    #[serde(default)]
    pub items: Vec<DecisionItem>,
}

impl DecisionList {
    pub fn new(entries: Vec<DecisionEntry>) -> Self {
        Self {
            items: entries
                .into_iter()
                .map(|pull_request| DecisionItem { pull_request })
                .collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DecisionEntry> {
        self.items.iter().map(|i| &i.pull_request)
    }

    /// Entries marked `pick`; what the apply step acts on.
    pub fn picks(&self) -> impl Iterator<Item = &DecisionEntry> {
        self.entries().filter(|e| e.decision.is_pick())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Collapse whitespace runs (including newlines) so text fits a comment line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render the annotated YAML document.
pub fn render_decision_list(list: &DecisionList) -> Result<String> {
    if list.is_empty() {
        return Ok("items: []\n".to_string());
    }

    let mut out = String::from("items:\n");
    for item in &list.items {
        let e = &item.pull_request;
        let opt = |v: &Option<String>| v.as_deref().map(one_line).unwrap_or_default();
        let _ = writeln!(out, "  # Description: {}", opt(&e.summary));
        let _ = writeln!(out, "  # Bug: {}", e.bug);
        let _ = writeln!(out, "  # Component: {}", opt(&e.component));
        let _ = writeln!(out, "  # Severity: {}", opt(&e.severity));
        let _ = writeln!(out, "  # PM Score: {}", opt(&e.pm_score));
        let _ = writeln!(out, "  # Score: {:.2}", e.score);
        let _ = writeln!(out, "  # Reason: {}", one_line(&e.decision_reason));

        let body = serde_yaml::to_string(item)?;
        for (i, line) in body.lines().enumerate() {
            let prefix = if i == 0 { "  - " } else { "    " };
            out.push_str(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse a document produced by [`render_decision_list`].
pub fn parse_decision_list(content: &str) -> Result<DecisionList> {
    Ok(serde_yaml::from_str(content)?)
}

/// Render and write the document to `path`.
pub fn write_decision_list(path: &Path, list: &DecisionList) -> Result<()> {
    let content = render_decision_list(list)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Read and parse a document from `path`.
pub fn read_decision_list(path: &Path) -> Result<DecisionList> {
    let content = std::fs::read_to_string(path)?;
    parse_decision_list(&content)
}

/// Fixed-width per-component summary.
pub fn render_metrics_table(metrics: &[ComponentMetric]) -> String {
    let mut rows: Vec<&ComponentMetric> = metrics.iter().collect();
    rows.sort_by(|a, b| a.component.cmp(&b.component));

    let width = rows
        .iter()
        .map(|m| m.component.len())
        .chain(std::iter::once("Component Name".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} | {:>5} | {:>5} | {:>5}",
        "Component Name", "Total", "Picks", "Skips"
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 24));
    for m in rows {
        let _ = writeln!(
            out,
            "{:<width$} | {:>5} | {:>5} | {:>5}",
            m.component, m.total, m.picks, m.skips
        );
    }
    out
}

/// Table of entries, optionally only those with the given decision.
pub fn render_decision_table(list: &DecisionList, only: Option<Decision>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<60} {:<8} {:>7}  {:<24} REASON",
        "URL", "DECISION", "SCORE", "COMPONENT"
    );
    for e in list
        .entries()
        .filter(|e| only.map_or(true, |d| e.decision == d))
    {
        let _ = writeln!(
            out,
            "{:<60} {:<8} {:>7.2}  {:<24} {}",
            e.url,
            e.decision,
            e.score,
            e.component.as_deref().unwrap_or("-"),
            one_line(&e.decision_reason)
        );
    }
    out
}
