use indexmap::IndexMap;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::model::{Result, Settings};
use crate::redmine::Issue;

pub const ISSUE_TYPE_FIELD: &str = "Issue Type";
pub const RESPONSIBLE_TEAM_FIELD: &str = "Responsible Team";

const API_KEY_HEADER: &str = "X-Redmine-API-Key";

pub type PageProgress<'a> = Box<dyn FnMut(usize) + Send + 'a>;

/// Result of a best-effort paginated fetch: whatever was retrieved before a
/// failure, plus the failure itself as a warning. Never an error — partial
/// data is used, not discarded.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub issues: Vec<Issue>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Redmine {
    http: Client,
    base_url: String,
    project: String,
    api_key: String,
}

impl Redmine {
    pub fn new(base_url: &str, project: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

// Custom field lookups
impl Redmine {
    /// Option value → label for one named custom field. A field that is
    /// missing or carries no `possible_values` yields an empty map.
    pub async fn custom_field_options(&self, field_name: &str) -> Result<IndexMap<String, String>> {
        let url = format!("{}/custom_fields.json", self.base_url);
        let body: Value = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut options = IndexMap::new();
        let Some(fields) = body["custom_fields"].as_array() else {
            return Ok(options);
        };
        let Some(field) = fields
            .iter()
            .find(|field| field["name"].as_str() == Some(field_name))
        else {
            return Ok(options);
        };
        if let Some(values) = field["possible_values"].as_array() {
            for item in values {
                let Some(value) = item["value"].as_str() else {
                    continue;
                };
                let label = item["label"].as_str().unwrap_or(value).trim().to_string();
                options.insert(value.to_string(), label);
            }
        }
        Ok(options)
    }

    /// The universal issue type code set: code → label.
    pub async fn issue_type_mapping(&self) -> Result<IndexMap<i64, String>> {
        let options = self.custom_field_options(ISSUE_TYPE_FIELD).await?;
        Ok(options
            .into_iter()
            .filter_map(|(value, label)| Some((value.parse::<i64>().ok()?, label)))
            .collect())
    }

    pub async fn team_mapping(&self) -> Result<IndexMap<String, String>> {
        self.custom_field_options(RESPONSIBLE_TEAM_FIELD).await
    }
}

// Issue list
impl Redmine {
    pub async fn fetch_issues<'a>(
        &self,
        settings: &Settings,
        issue_types: &IndexMap<i64, String>,
        teams: &IndexMap<String, String>,
        mut cb: PageProgress<'a>,
    ) -> FetchOutcome {
        let url = format!("{}/projects/{}/issues.json", self.base_url, self.project);
        let mut issues = Vec::new();
        let mut warning = None;
        let mut offset = 0;

        while offset < settings.fetch_max {
            cb(offset);
            let page = match self.issues_page(&url, settings.fetch_limit, offset).await {
                Ok(page) => page,
                Err(err) => {
                    warning = Some(format!(
                        "Issue fetch stopped at offset {}: {} (using {} issues already fetched)",
                        offset,
                        err,
                        issues.len()
                    ));
                    break;
                }
            };
            if page.is_empty() {
                break;
            }
            for raw in &page {
                issues.push(Issue::from_raw(raw, issue_types, teams));
            }
            offset += settings.fetch_limit;
            tokio::time::sleep(Duration::from_millis(settings.fetch_delay_ms)).await;
        }

        FetchOutcome { issues, warning }
    }

    async fn issues_page(&self, url: &str, limit: usize, offset: usize) -> Result<Vec<Value>> {
        let body: Value = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("include", "custom_fields".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body["issues"].as_array().cloned().unwrap_or_default())
    }
}

// Journals
impl Redmine {
    pub async fn issue_journals(&self, issue_id: i64) -> Result<Vec<Value>> {
        let url = format!("{}/issues/{}.json", self.base_url, issue_id);
        let body: Value = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("include", "journals")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body["issue"]["journals"].as_array().cloned().unwrap_or_default())
    }
}
