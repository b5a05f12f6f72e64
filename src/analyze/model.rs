use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;

use crate::redmine::{Issue, Resolver};

pub type IssueSet = Vec<Issue>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Category {
    Transactional,
    NonTransactional,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Category::Transactional => "Transactional",
            Category::NonTransactional => "Non-Transactional",
        }
    }
}

pub fn week_label(week_num: i64) -> String {
    format!("W{:02}", week_num)
}

/// Issue augmented with the derived reporting columns. Week 0 is anchored at
/// the newest `created_on` in the batch and counts backward in time.
#[derive(Debug, Clone)]
pub struct PreparedIssue {
    pub issue: Issue,
    pub created_on: DateTime<FixedOffset>,
    pub week_num: i64,
    pub week_label: String,
    pub category: Category,
}

/// One (owner, issue type) row of the weekly pivot. `week_counts` is fully
/// populated: a week with no hits carries an explicit 0.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub assigned_to: String,
    pub issue_type: String,
    pub week_counts: IndexMap<String, usize>,
    pub grand_total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IssueSummary {
    pub weeks: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl IssueSummary {
    pub fn week_total(&self, week: &str) -> usize {
        self.rows
            .iter()
            .map(|row| row.week_counts.get(week).copied().unwrap_or(0))
            .sum()
    }

    pub fn grand_total(&self) -> usize {
        self.rows.iter().map(|row| row.grand_total).sum()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TeamRollupRow {
    pub issue_type: String,
    pub responsible_team: String,
    pub count: usize,
}

/// Per-resolver counts in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTally {
    counts: IndexMap<Resolver, usize>,
}

impl ResolvedTally {
    pub fn add(&mut self, resolver: Resolver) {
        *self.counts.entry(resolver).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Resolver, usize)> {
        self.counts.iter().map(|(resolver, count)| (resolver, *count))
    }
}
