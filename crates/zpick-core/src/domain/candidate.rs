//! Candidate pull requests and their resolved defect metadata.

use serde::{Deserialize, Serialize};

/// A pull request under consideration, as returned by the candidate source.
///
/// This is the lightweight first phase of a candidate: everything on it is
/// known without asking the defect tracker. Rules evaluate this record only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Numeric pull request identifier.
    pub id: u64,
    /// Browser URL of the pull request.
    pub url: String,
    /// Pull request title (carries the `Bug NNNN:` reference).
    pub title: String,
    /// Linked defect number.
    pub defect_id: u64,
    /// Tracker labels currently set on the pull request.
    pub labels: Vec<String>,
}

impl Candidate {
    pub fn new(id: u64, url: impl Into<String>, defect_id: u64) -> Self {
        Self {
            id,
            url: url.into(),
            title: String::new(),
            defect_id,
            labels: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

/// Defect metadata resolved from the defect tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefectRecord {
    pub id: u64,
    pub summary: String,
    pub severity: String,
    /// Component path, outermost first (e.g. `["Storage", "CSI"]`).
    pub component: Vec<String>,
    /// Raw product-management priority; not guaranteed to be numeric.
    pub priority: String,
    pub keywords: Vec<String>,
    pub flags: Vec<String>,
}

impl DefectRecord {
    /// First element of the component path, if any.
    pub fn primary_component(&self) -> Option<&str> {
        self.component.first().map(String::as_str)
    }

    /// Normalized component key: lower-cased, `/`-joined.
    pub fn component_key(&self) -> String {
        component_key(&self.component)
    }
}

/// Normalize a component path into the key used for capacity accounting.
pub fn component_key<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/")
        .to_lowercase()
}

/// A candidate together with its resolved defect; the input to classifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedCandidate {
    pub candidate: Candidate,
    pub defect: DefectRecord,
}

impl EnrichedCandidate {
    pub fn new(candidate: Candidate, defect: DefectRecord) -> Self {
        Self { candidate, defect }
    }
}

/// An enriched candidate with its composite score written exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub enriched: EnrichedCandidate,
    pub score: f32,
}
