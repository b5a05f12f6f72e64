use serde_json::{from_str, Value};
use std::fs;

use crate::model::Result;

const DEFAULT_HIGHLIGHT_THRESHOLD: usize = 50;
const DEFAULT_OPEN_STATUSES: [&str; 3] = ["New", "In Progress", "Open"];
const DEFAULT_FETCH_LIMIT: usize = 100;
const DEFAULT_FETCH_MAX: usize = 50_000;
const DEFAULT_FETCH_DELAY_MS: u64 = 300;

/// Report tuning knobs read from `settings.json`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub assignee: String,
    pub transactional_keywords: Vec<String>,
    pub highlight_threshold: usize,
    pub timezone_offset_hours: i64,
    pub open_statuses: Vec<String>,
    pub fetch_limit: usize,
    pub fetch_max: usize,
    pub fetch_delay_ms: u64,
}

// Create
impl Settings {
    pub fn from_config(path: &str) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::parse(&json_str)
    }
}

// Parser
impl Settings {
    fn parse(json_str: &str) -> Result<Self> {
        let root: Value = from_str(json_str)?;
        let Some(assignee) = root["assignee"].as_str() else {
            return Err("Not found 'assignee' field".into());
        };
        let transactional_keywords = match root["transactionalKeywords"].as_array() {
            Some(list) => list
                .iter()
                .filter_map(|keyword| keyword.as_str().map(String::from))
                .collect(),
            None => return Err("Not found 'transactionalKeywords' field".into()),
        };
        let Some(timezone_offset_hours) = root["timezoneOffsetHours"].as_i64() else {
            return Err("Not found 'timezoneOffsetHours' field".into());
        };
        let highlight_threshold = root["highlightThreshold"]
            .as_u64()
            .map(|threshold| threshold as usize)
            .unwrap_or(DEFAULT_HIGHLIGHT_THRESHOLD);
        let open_statuses = match root["openStatuses"].as_array() {
            Some(list) => list
                .iter()
                .filter_map(|status| status.as_str().map(String::from))
                .collect(),
            None => DEFAULT_OPEN_STATUSES.iter().map(|s| s.to_string()).collect(),
        };
        let fetch_limit = root["fetchLimit"]
            .as_u64()
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_FETCH_LIMIT);
        let fetch_max = root["fetchMax"]
            .as_u64()
            .map(|max| max as usize)
            .unwrap_or(DEFAULT_FETCH_MAX);
        let fetch_delay_ms = root["fetchDelayMs"].as_u64().unwrap_or(DEFAULT_FETCH_DELAY_MS);

        Ok(Self {
            assignee: assignee.to_string(),
            transactional_keywords,
            highlight_threshold,
            timezone_offset_hours,
            open_statuses,
            fetch_limit,
            fetch_max,
            fetch_delay_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_applies_defaults_for_optional_fields() {
        let settings = Settings::parse(
            r#"{
                "assignee": "tech ops",
                "transactionalKeywords": ["Cashback Failed", "Mobile recharge failed"],
                "timezoneOffsetHours": 6
            }"#,
        )
        .unwrap();

        assert_eq!(settings.assignee, "tech ops");
        assert_eq!(settings.transactional_keywords.len(), 2);
        assert_eq!(settings.highlight_threshold, 50);
        assert_eq!(settings.open_statuses, ["New", "In Progress", "Open"]);
        assert_eq!(settings.fetch_limit, 100);
        assert_eq!(settings.fetch_max, 50_000);
        assert_eq!(settings.fetch_delay_ms, 300);
    }

    #[test]
    fn parse_honors_explicit_values() {
        let settings = Settings::parse(
            r#"{
                "assignee": "support",
                "transactionalKeywords": [],
                "timezoneOffsetHours": -3,
                "highlightThreshold": 10,
                "openStatuses": ["Open"],
                "fetchLimit": 25,
                "fetchMax": 200,
                "fetchDelayMs": 50
            }"#,
        )
        .unwrap();

        assert_eq!(settings.timezone_offset_hours, -3);
        assert_eq!(settings.highlight_threshold, 10);
        assert_eq!(settings.open_statuses, ["Open"]);
        assert_eq!(settings.fetch_limit, 25);
        assert_eq!(settings.fetch_max, 200);
        assert_eq!(settings.fetch_delay_ms, 50);
    }

    #[test]
    fn parse_rejects_missing_required_field() {
        let result = Settings::parse(r#"{"transactionalKeywords": [], "timezoneOffsetHours": 0}"#);
        assert!(result.is_err());
    }
}
