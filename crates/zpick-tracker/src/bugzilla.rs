//! Bugzilla REST client resolving defect metadata.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use zpick_core::{DefectRecord, DefectResolver};

use crate::error::TrackerError;
use crate::Result;

pub const DEFAULT_BUGZILLA_URL: &str = "https://bugzilla.redhat.com";

/// Only the fields the classifiers read.
const INCLUDE_FIELDS: &str = "id,summary,severity,component,keywords,flags,cf_pm_score";

#[derive(Debug, Clone)]
pub struct BugzillaConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for BugzillaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BUGZILLA_URL.to_string(),
            api_key: None,
        }
    }
}

impl BugzillaConfig {
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct BugResponse {
    #[serde(default)]
    bugs: Vec<Bug>,
}

/// Bugzilla returns `component` as a list; older instances use a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl From<OneOrMany> for Vec<String> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) if s.is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Bug {
    id: u64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    component: OneOrMany,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    flags: Vec<BugFlag>,
    #[serde(default)]
    cf_pm_score: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BugFlag {
    name: String,
}

impl From<Bug> for DefectRecord {
    fn from(bug: Bug) -> Self {
        let priority = match bug.cf_pm_score {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        DefectRecord {
            id: bug.id,
            summary: bug.summary,
            severity: bug.severity,
            component: bug.component.into(),
            priority,
            keywords: bug.keywords,
            flags: bug.flags.into_iter().map(|f| f.name).collect(),
        }
    }
}

/// Decode a `/rest/bug/<id>` response body.
pub fn decode_bug(defect_id: u64, body: &str) -> Result<DefectRecord> {
    let response: BugResponse = serde_json::from_str(body)?;
    response
        .bugs
        .into_iter()
        .find(|b| b.id == defect_id)
        .map(DefectRecord::from)
        .ok_or(TrackerError::DefectNotFound(defect_id))
}

pub struct BugzillaClient {
    config: BugzillaConfig,
    http_client: reqwest::Client,
}

impl BugzillaClient {
    pub fn new(config: BugzillaConfig) -> Result<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(config.base_url));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("zpick/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub async fn get_bug(&self, defect_id: u64) -> Result<DefectRecord> {
        let url = format!(
            "{}/rest/bug/{}",
            self.config.base_url.trim_end_matches('/'),
            defect_id
        );
        let mut request = self
            .http_client
            .get(&url)
            .query(&[("include_fields", INCLUDE_FIELDS)]);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-BUGZILLA-API-KEY", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(defect_id = defect_id, "bug fetched");
        decode_bug(defect_id, &body)
    }
}

#[async_trait]
impl DefectResolver for BugzillaClient {
    async fn resolve_defect(&self, defect_id: u64) -> zpick_core::Result<DefectRecord> {
        Ok(self.get_bug(defect_id).await?)
    }
}
