use csv as csv_crate;
use std::fs::File;
use std::io::Write;

use crate::analyze::analyzer::is_open_team_issue;
use crate::analyze::{Category, PreparedIssue};
use crate::model::Result;
use crate::redmine::Issue;

// Spreadsheet tools only detect UTF-8 when the file leads with a BOM.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const CATEGORY_HEADER: [&str; 6] = [
    "week_label",
    "Link",
    "issue_type",
    "Assigned to",
    "start_date",
    "created_on",
];
const TEAM_HEADER: [&str; 3] = ["TICKET ID", "ISSUE_TYPE", "RESPONSIBLE TEAM"];

fn bom_writer(path: &str) -> Result<csv_crate::Writer<File>> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    Ok(csv_crate::Writer::from_writer(file))
}

pub fn issue_link(base_url: &str, issue_id: i64) -> String {
    format!("{}/issues/{}", base_url.trim_end_matches('/'), issue_id)
}

/// Per-category extract of the prepared frame, one row per issue.
pub fn write_category_csv(
    path: &str,
    prepared: &[PreparedIssue],
    category: Category,
    base_url: &str,
) -> Result<()> {
    let mut writer = bom_writer(path)?;
    writer.write_record(CATEGORY_HEADER)?;
    for item in prepared.iter().filter(|item| item.category == category) {
        let link = issue_link(base_url, item.issue.id);
        writer.write_record([
            item.week_label.as_str(),
            link.as_str(),
            item.issue.issue_type.as_deref().unwrap_or(""),
            item.issue.assigned_to.as_deref().unwrap_or(""),
            item.issue.start_date.as_deref().unwrap_or(""),
            item.issue.created_on.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Ticket-level extract behind the team rollup, same filters as the table.
pub fn write_team_csv(
    path: &str,
    issues: &[Issue],
    open_statuses: &[String],
    base_url: &str,
) -> Result<()> {
    let mut writer = bom_writer(path)?;
    writer.write_record(TEAM_HEADER)?;
    for issue in issues.iter().filter(|issue| is_open_team_issue(issue, open_statuses)) {
        let Some(issue_type) = issue.issue_type.as_deref() else {
            continue;
        };
        let link = issue_link(base_url, issue.id);
        writer.write_record([
            link.as_str(),
            issue_type,
            issue.responsible_team.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::fs;

    fn prepared(id: i64, category: Category) -> PreparedIssue {
        PreparedIssue {
            issue: Issue {
                id,
                status: "New".to_string(),
                issue_type: Some("Bug".to_string()),
                start_date: Some("2025-07-01".to_string()),
                created_on: "2025-07-01T09:00:00Z".to_string(),
                updated_on: None,
                assigned_to: Some("Tech Ops".to_string()),
                responsible_team: None,
            },
            created_on: DateTime::parse_from_rfc3339("2025-07-01T09:00:00Z").unwrap(),
            week_num: 1,
            week_label: "W01".to_string(),
            category,
        }
    }

    #[test]
    fn category_csv_has_bom_header_and_link() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trx.csv");
        let path = path.to_str().unwrap();

        let rows = vec![
            prepared(11, Category::Transactional),
            prepared(12, Category::NonTransactional),
        ];
        write_category_csv(path, &rows, Category::Transactional, "https://redmine.example.net/").unwrap();

        let bytes = fs::read(path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "week_label,Link,issue_type,Assigned to,start_date,created_on"
        );
        assert_eq!(
            lines.next().unwrap(),
            "W01,https://redmine.example.net/issues/11,Bug,Tech Ops,2025-07-01,2025-07-01T09:00:00Z"
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn team_csv_applies_rollup_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("team.csv");
        let path = path.to_str().unwrap();

        let issues = vec![
            Issue {
                id: 1,
                status: "Open".to_string(),
                issue_type: Some("Bug".to_string()),
                start_date: None,
                created_on: "2025-07-01T09:00:00Z".to_string(),
                updated_on: None,
                assigned_to: None,
                responsible_team: Some("Payments".to_string()),
            },
            Issue {
                id: 2,
                status: "Open".to_string(),
                issue_type: Some("Bug".to_string()),
                start_date: None,
                created_on: "2025-07-01T09:00:00Z".to_string(),
                updated_on: None,
                assigned_to: None,
                responsible_team: Some("N/A".to_string()),
            },
            Issue {
                id: 3,
                status: "Resolved".to_string(),
                issue_type: Some("Bug".to_string()),
                start_date: None,
                created_on: "2025-07-01T09:00:00Z".to_string(),
                updated_on: None,
                assigned_to: None,
                responsible_team: Some("Payments".to_string()),
            },
        ];
        let open_statuses = vec![
            "New".to_string(),
            "In Progress".to_string(),
            "Open".to_string(),
        ];
        write_team_csv(path, &issues, &open_statuses, "https://redmine.example.net").unwrap();

        let bytes = fs::read(path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "TICKET ID,ISSUE_TYPE,RESPONSIBLE TEAM");
        assert_eq!(
            lines.next().unwrap(),
            "https://redmine.example.net/issues/1,Bug,Payments"
        );
        assert_eq!(lines.next(), None);
    }
}
