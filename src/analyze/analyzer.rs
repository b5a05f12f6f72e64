use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::analyze::{
    week_label, Category, IssueSet, IssueSummary, PreparedIssue, SummaryRow, TeamRollupRow,
};
use crate::model::{Result, Settings};
use crate::redmine::Issue;

/// Wire format of `updated_on` in tracker payloads.
pub const UPDATED_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub trait Preparer {
    fn prepare(&self, settings: &Settings) -> Result<Vec<PreparedIssue>>;
}

impl Preparer for IssueSet {
    fn prepare(&self, settings: &Settings) -> Result<Vec<PreparedIssue>> {
        let mut parsed = Vec::with_capacity(self.len());
        for issue in self {
            let Ok(created_on) = DateTime::parse_from_rfc3339(&issue.created_on) else {
                return Err(format!(
                    "Issue {}: unparsable created_on '{}'",
                    issue.id, issue.created_on
                )
                .into());
            };
            parsed.push((issue.clone(), created_on));
        }

        // Week 0 anchors at the newest issue of the whole batch, before any
        // assignee filtering.
        let Some(anchor) = parsed.iter().map(|(_, created_on)| *created_on).max() else {
            return Ok(vec![]);
        };

        let assignee = settings.assignee.trim().to_lowercase();
        let prepared = parsed
            .into_iter()
            .filter(|(issue, _)| {
                issue
                    .assigned_to
                    .as_deref()
                    .is_some_and(|assigned| assigned.trim().to_lowercase() == assignee)
            })
            .map(|(issue, created_on)| {
                let week_num = (anchor - created_on).num_days() / 7;
                let category = classify(issue.issue_type.as_deref(), &settings.transactional_keywords);
                PreparedIssue {
                    week_label: week_label(week_num),
                    issue,
                    created_on,
                    week_num,
                    category,
                }
            })
            .collect();
        Ok(prepared)
    }
}

fn classify(issue_type: Option<&str>, keywords: &[String]) -> Category {
    let label = issue_type.unwrap_or("None").to_lowercase();
    let transactional = keywords
        .iter()
        .any(|keyword| label.contains(&keyword.to_lowercase()));
    if transactional {
        Category::Transactional
    } else {
        Category::NonTransactional
    }
}

pub trait Summarizer {
    fn summarize(&self) -> IssueSummary;
}

impl Summarizer for [PreparedIssue] {
    fn summarize(&self) -> IssueSummary {
        if self.is_empty() {
            return IssueSummary::default();
        }

        let weeks = self
            .iter()
            .map(|prepared| (prepared.week_num, prepared.week_label.clone()))
            .unique()
            .sorted()
            .map(|(_, label)| label)
            .collect::<Vec<_>>();

        let mut groups: BTreeMap<(String, String), HashMap<String, usize>> = BTreeMap::new();
        for prepared in self {
            let Some(issue_type) = prepared.issue.issue_type.clone() else {
                continue;
            };
            let assigned_to = prepared.issue.assigned_to.clone().unwrap_or_default();
            *groups
                .entry((assigned_to, issue_type))
                .or_default()
                .entry(prepared.week_label.clone())
                .or_insert(0) += 1;
        }

        let rows = groups
            .into_iter()
            .map(|((assigned_to, issue_type), counts)| {
                let week_counts = weeks
                    .iter()
                    .map(|week| (week.clone(), counts.get(week).copied().unwrap_or(0)))
                    .collect::<IndexMap<_, _>>();
                let grand_total = week_counts.values().sum();
                SummaryRow {
                    assigned_to,
                    issue_type,
                    week_counts,
                    grand_total,
                }
            })
            .collect();

        IssueSummary { weeks, rows }
    }
}

pub trait TeamRollup {
    fn summarize_by_team(&self, open_statuses: &[String]) -> Vec<TeamRollupRow>;
}

impl TeamRollup for IssueSet {
    fn summarize_by_team(&self, open_statuses: &[String]) -> Vec<TeamRollupRow> {
        let mut groups: IndexMap<(String, String), usize> = IndexMap::new();
        for issue in self.iter().filter(|issue| is_open_team_issue(issue, open_statuses)) {
            let Some(issue_type) = issue.issue_type.clone() else {
                continue;
            };
            let team = issue.responsible_team.clone().unwrap_or_default();
            *groups.entry((issue_type, team)).or_insert(0) += 1;
        }

        groups
            .into_iter()
            .map(|((issue_type, responsible_team), count)| TeamRollupRow {
                issue_type,
                responsible_team,
                count,
            })
            // Count descending; ties broken by issue type, then team, so the
            // order never depends on grouping internals.
            .sorted_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.issue_type.cmp(&b.issue_type))
                    .then_with(|| a.responsible_team.cmp(&b.responsible_team))
            })
            .collect()
    }
}

/// Shared filter for the team rollup table and its CSV extract.
pub fn is_open_team_issue(issue: &Issue, open_statuses: &[String]) -> bool {
    if !open_statuses.iter().any(|status| status == &issue.status) {
        return false;
    }
    let Some(team) = issue.responsible_team.as_deref() else {
        return false;
    };
    let team = team.trim();
    !team.is_empty() && !team.eq_ignore_ascii_case("N/A")
}

/// "Today" in report-local time: UTC shifted by the configured offset.
pub fn local_today(offset_hours: i64) -> NaiveDate {
    (Utc::now() + Duration::hours(offset_hours)).date_naive()
}

/// Phase 1 of the resolved-by report: issues whose status is resolved and
/// whose last update, shifted to report-local time, falls on `today`.
pub fn resolved_today<'a>(issues: &'a [Issue], offset_hours: i64, today: NaiveDate) -> Vec<&'a Issue> {
    issues
        .iter()
        .filter(|issue| {
            if !issue.status.trim().eq_ignore_ascii_case("resolved") {
                return false;
            }
            let Some(updated_on) = issue.updated_on.as_deref() else {
                return false;
            };
            let Ok(updated) = NaiveDateTime::parse_from_str(updated_on, UPDATED_ON_FORMAT) else {
                return false;
            };
            (updated + Duration::hours(offset_hours)).date() == today
        })
        .collect()
}
