//! GitHub issue search as a candidate source.
//!
//! Candidates are open pull requests matched by a search query built from a
//! template. Each must reference its defect in the title (`Bug 1234: ...`);
//! titles without a reference are dropped with a warning.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};
use zpick_core::{Candidate, CandidateSource};

use crate::error::TrackerError;
use crate::Result;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// `{release}` is replaced with the release being planned.
pub const DEFAULT_QUERY_TEMPLATE: &str = "org:kube-reporting org:openshift org:operator-framework \
label:lgtm label:approved label:bugzilla/valid-bug \
base:release-{release} base:openshift-{release} base:enterprise-{release} \
is:pr -repo:openshift/openshift-docs";

/// Appended to every candidate query: open and not yet approved.
const CANDIDATE_FILTER: &str = "is:open -label:cherry-pick-approved";

pub const DEFAULT_TITLE_PATTERN: &str = r"bug (\d+):";

/// GitHub caps search results at 1000, i.e. 10 pages of 100.
const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 10;

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub query_template: String,
    /// Case-insensitive pattern whose first group is the defect number.
    pub title_pattern: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            query_template: DEFAULT_QUERY_TEMPLATE.to_string(),
            title_pattern: DEFAULT_TITLE_PATTERN.to_string(),
        }
    }
}

impl GithubConfig {
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
    html_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    labels: Vec<SearchLabel>,
    /// Present only when the issue is a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchLabel {
    name: String,
}

pub struct GithubLister {
    config: GithubConfig,
    title_pattern: Regex,
    http_client: reqwest::Client,
}

impl GithubLister {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let title_pattern = Regex::new(&format!("(?i){}", config.title_pattern))
            .map_err(|e| TrackerError::InvalidPattern(e.to_string()))?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("zpick/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            title_pattern,
            http_client,
        })
    }

    /// Full search query for `release`.
    pub fn search_query(&self, release: &str) -> String {
        format!(
            "{} {}",
            self.config.query_template.replace("{release}", release),
            CANDIDATE_FILTER
        )
    }

    /// Defect number referenced by a pull request title.
    pub fn parse_bug_number(&self, title: &str) -> Option<u64> {
        self.title_pattern
            .captures(title)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Decode one page of search results into candidates.
    ///
    /// Returns the candidates and the number of raw items on the page.
    pub fn decode_search_page(&self, body: &str) -> Result<(Vec<Candidate>, usize)> {
        let page: SearchResponse = serde_json::from_str(body)?;
        debug!(total_count = page.total_count, items = page.items.len(), "search page decoded");
        let raw = page.items.len();
        let candidates = page
            .items
            .into_iter()
            .filter(|item| item.pull_request.is_some())
            .filter_map(|item| self.to_candidate(item))
            .collect();
        Ok((candidates, raw))
    }

    fn to_candidate(&self, item: SearchItem) -> Option<Candidate> {
        let Some(defect_id) = self.parse_bug_number(&item.title) else {
            warn!(
                url = %item.html_url,
                title = %item.title,
                "pull request title does not reference a bug; skipping"
            );
            return None;
        };
        let candidate = item
            .labels
            .into_iter()
            .fold(Candidate::new(item.number, item.html_url, defect_id), |c, l| {
                c.with_label(l.name)
            })
            .with_title(item.title);
        Some(candidate)
    }

    async fn fetch_page(&self, query: &str, page: usize) -> Result<String> {
        let url = format!("{}/search/issues", self.config.api_url.trim_end_matches('/'));
        let per_page = PER_PAGE.to_string();
        let page = page.to_string();
        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query),
                ("sort", "updated"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ]);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// All candidate pull requests for `release`, following pagination.
    pub async fn list_for_release(&self, release: &str) -> Result<Vec<Candidate>> {
        let query = self.search_query(release);
        info!(release = %release, "searching GitHub for candidate pull requests");

        let mut candidates = Vec::new();
        for page in 1..=MAX_PAGES {
            let body = self.fetch_page(&query, page).await?;
            let (mut found, raw) = self.decode_search_page(&body)?;
            candidates.append(&mut found);
            if raw < PER_PAGE {
                break;
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl CandidateSource for GithubLister {
    async fn list_candidates(&self, release: &str) -> zpick_core::Result<Vec<Candidate>> {
        Ok(self.list_for_release(release).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lister() -> GithubLister {
        GithubLister::new(GithubConfig::default()).unwrap()
    }

    #[test]
    fn query_substitutes_every_release_placeholder() {
        let query = lister().search_query("4.7");
        assert!(query.contains("base:release-4.7 base:openshift-4.7 base:enterprise-4.7"));
        assert!(!query.contains("{release}"));
        assert!(query.ends_with("is:open -label:cherry-pick-approved"));
    }

    #[test]
    fn bug_number_is_parsed_case_insensitively() {
        let l = lister();
        assert_eq!(l.parse_bug_number("Bug 1893741: fix kubelet crash"), Some(1893741));
        assert_eq!(l.parse_bug_number("[release-4.6] BUG 42: backport"), Some(42));
        assert_eq!(l.parse_bug_number("Bug 42 fix without colon"), None);
        assert_eq!(l.parse_bug_number("update docs"), None);
    }

    #[test]
    fn invalid_title_pattern_is_rejected() {
        let config = GithubConfig {
            title_pattern: "bug (".to_string(),
            ..Default::default()
        };
        assert!(GithubLister::new(config).is_err());
    }

    #[test]
    fn search_page_decodes_pull_requests_with_bug_titles() {
        let body = r#"{
            "total_count": 3,
            "items": [
                {
                    "number": 101,
                    "html_url": "https://github.com/openshift/origin/pull/101",
                    "title": "Bug 2001: fix router reload",
                    "labels": [{"name": "lgtm"}, {"name": "bugzilla/severity-high"}],
                    "pull_request": {"url": "https://api.github.com/repos/openshift/origin/pulls/101"}
                },
                {
                    "number": 102,
                    "html_url": "https://github.com/openshift/origin/pull/102",
                    "title": "bump dependencies",
                    "labels": [],
                    "pull_request": {}
                },
                {
                    "number": 103,
                    "html_url": "https://github.com/openshift/origin/issues/103",
                    "title": "Bug 2003: an issue, not a PR",
                    "labels": []
                }
            ]
        }"#;
        let (candidates, raw) = lister().decode_search_page(body).unwrap();
        assert_eq!(raw, 3);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.id, 101);
        assert_eq!(c.defect_id, 2001);
        assert_eq!(c.labels, vec!["lgtm", "bugzilla/severity-high"]);
        assert_eq!(c.title, "Bug 2001: fix router reload");
    }

    #[test]
    fn malformed_search_page_is_a_json_error() {
        let err = lister().decode_search_page("{\"items\": 7}").unwrap_err();
        assert!(matches!(err, TrackerError::Json(_)));
    }
}
