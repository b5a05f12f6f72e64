use serde_json::Value;

use crate::redmine::Redmine;

/// Who closed an issue, per its audit journal. The two non-named outcomes are
/// distinct: `Unknown` means no qualifying status change exists, `Error` means
/// the lookup itself failed.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub enum Resolver {
    Named(String),
    Unknown,
    Error,
}

impl Resolver {
    pub fn label(&self) -> &str {
        match self {
            Resolver::Named(name) => name,
            Resolver::Unknown => "Unknown",
            Resolver::Error => "Error",
        }
    }
}

pub trait ResolvedByLookup {
    async fn resolved_by(&self, issue_id: i64) -> Resolver;
}

impl ResolvedByLookup for Redmine {
    async fn resolved_by(&self, issue_id: i64) -> Resolver {
        match self.issue_journals(issue_id).await {
            Ok(journals) => resolver_from_journals(&journals),
            Err(_) => Resolver::Error,
        }
    }
}

/// Scans journal entries newest-first and credits the actor of the most
/// recent entry that carries a status change.
pub fn resolver_from_journals(journals: &[Value]) -> Resolver {
    for journal in journals.iter().rev() {
        let Some(details) = journal["details"].as_array() else {
            continue;
        };
        let status_changed = details.iter().any(|detail| {
            detail["name"].as_str() == Some("status_id")
                && detail["new_value"].as_str().is_some_and(|value| !value.is_empty())
        });
        if status_changed {
            return match journal["user"]["name"].as_str() {
                Some(name) => Resolver::Named(name.to_string()),
                None => Resolver::Unknown,
            };
        }
    }
    Resolver::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_most_recent_status_change() {
        let journals = vec![
            json!({
                "user": {"name": "First Closer"},
                "details": [{"name": "status_id", "new_value": "3"}]
            }),
            json!({
                "user": {"name": "Commenter"},
                "details": []
            }),
            json!({
                "user": {"name": "Final Closer"},
                "details": [
                    {"name": "assigned_to_id", "new_value": "9"},
                    {"name": "status_id", "new_value": "5"}
                ]
            }),
        ];

        assert_eq!(
            resolver_from_journals(&journals),
            Resolver::Named("Final Closer".to_string())
        );
    }

    #[test]
    fn no_status_change_is_unknown() {
        let journals = vec![json!({
            "user": {"name": "Commenter"},
            "details": [{"name": "assigned_to_id", "new_value": "9"}]
        })];
        assert_eq!(resolver_from_journals(&journals), Resolver::Unknown);
    }

    #[test]
    fn empty_new_value_does_not_count() {
        let journals = vec![json!({
            "user": {"name": "Actor"},
            "details": [{"name": "status_id", "new_value": ""}]
        })];
        assert_eq!(resolver_from_journals(&journals), Resolver::Unknown);
    }

    #[test]
    fn missing_user_name_is_unknown() {
        let journals = vec![json!({
            "details": [{"name": "status_id", "new_value": "5"}]
        })];
        assert_eq!(resolver_from_journals(&journals), Resolver::Unknown);
    }

    #[test]
    fn resolver_labels() {
        assert_eq!(Resolver::Named("Rina".to_string()).label(), "Rina");
        assert_eq!(Resolver::Unknown.label(), "Unknown");
        assert_eq!(Resolver::Error.label(), "Error");
    }
}
