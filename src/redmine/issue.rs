use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;

use crate::model::Result;

/// One normalized tracker issue, the unit persisted in the snapshot file.
/// Custom fields are already decoded to labels; downstream stages never see
/// raw option codes.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub status: String,
    pub issue_type: Option<String>,
    pub start_date: Option<String>,
    pub created_on: String,
    pub updated_on: Option<String>,
    pub assigned_to: Option<String>,
    pub responsible_team: Option<String>,
}

// Create
impl Issue {
    pub fn from_raw(
        raw: &Value,
        issue_types: &IndexMap<i64, String>,
        teams: &IndexMap<String, String>,
    ) -> Self {
        let custom_fields = raw["custom_fields"].as_array().cloned().unwrap_or_default();

        let issue_type = custom_field_value(&custom_fields, "Issue Type")
            .map(|value| decode_issue_type(&value, issue_types));
        let responsible_team = custom_field_value(&custom_fields, "Responsible Team")
            .map(|value| teams.get(&value).cloned().unwrap_or(value));

        Self {
            id: raw["id"].as_i64().unwrap_or_default(),
            status: raw["status"]["name"].as_str().unwrap_or_default().to_string(),
            issue_type,
            start_date: raw["start_date"].as_str().map(String::from),
            created_on: raw["created_on"].as_str().unwrap_or_default().to_string(),
            updated_on: raw["updated_on"].as_str().map(String::from),
            assigned_to: raw["assigned_to"]["name"].as_str().map(String::from),
            responsible_team,
        }
    }
}

// Snapshot
impl Issue {
    pub fn snapshot_write(path: &str, issues: &[Issue]) -> Result<()> {
        let json_str = serde_json::to_string_pretty(issues)?;
        fs::write(path, json_str)?;
        Ok(())
    }

    pub fn snapshot_read(path: &str) -> Result<Vec<Issue>> {
        let json_str = fs::read_to_string(path)?;
        let issues = serde_json::from_str(&json_str)?;
        Ok(issues)
    }
}

fn custom_field_value(fields: &[Value], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|field| field["name"].as_str() == Some(name))
        .and_then(|field| field["value"].as_str())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Tracker custom fields carry option codes as digit strings; anything else is
/// already a label and passes through untouched.
fn decode_issue_type(raw_value: &str, issue_types: &IndexMap<i64, String>) -> String {
    let is_code = !raw_value.is_empty() && raw_value.chars().all(|c| c.is_ascii_digit());
    if is_code {
        if let Ok(code) = raw_value.parse::<i64>() {
            if let Some(label) = issue_types.get(&code) {
                return label.clone();
            }
        }
    }
    raw_value.to_string()
}
