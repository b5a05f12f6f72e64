mod analyze;
mod model;
mod redmine;
mod report;
mod utils;

use std::fs;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use indexmap::IndexMap;
use indicatif::{MultiProgress, ProgressBar};

use crate::analyze::analyzer::{local_today, resolved_today, Preparer, Summarizer, TeamRollup};
use crate::analyze::{Category, IssueSet, PreparedIssue, ResolvedTally};
use crate::model::{OwnerMapping, Result, Settings};
use crate::redmine::{FetchOutcome, Issue, Redmine, ResolvedByLookup};
use crate::report::csv::{write_category_csv, write_team_csv};
use crate::report::html::{render_document, CategoryTable, ResolvedTable, TeamTable};
use crate::utils::{MultiProgressNew, ProgressStyleTemplate};

#[derive(Parser, Debug, Clone)]
struct Args {
    #[arg(long = "settings", default_value = "settings.json")]
    settings_path: String,
    #[arg(long = "owners", default_value = "owners.json")]
    owners_path: String,
    #[arg(long = "snapshot", default_value = "redmine_issues.json")]
    snapshot_path: String,
    #[arg(long = "report", default_value = "report.html")]
    report_path: String,
    #[arg(long = "trx_csv", default_value = "transactional_issues.csv")]
    trx_csv_path: String,
    #[arg(long = "non_trx_csv", default_value = "non_transactional_issues.csv")]
    non_trx_csv_path: String,
    #[arg(long = "team_csv", default_value = "responsible_team_issues.csv")]
    team_csv_path: String,
    #[arg(long = "tracker_url")]
    tracker_url: String,
    #[arg(long = "project")]
    project: String,
    #[arg(long = "api_key")]
    api_key: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    run(&args).await.unwrap()
}

async fn run(args: &Args) -> Result<()> {
    let (settings, owners) = parse_configs(args).await?;

    let redmine = Redmine::new(&args.tracker_url, &args.project, &args.api_key);
    let (issue_types, teams) = fetch_mappings(&redmine).await;
    let owners = owners.with_unassigned(&issue_types);

    let issues = fetch_snapshot(&redmine, &settings, &issue_types, &teams, &args.snapshot_path).await?;

    let prepared = issues.prepare(&settings)?;
    let transactional = filter_category(&prepared, Category::Transactional);
    let non_transactional = filter_category(&prepared, Category::NonTransactional);
    let trx_summary = transactional.summarize();
    let non_trx_summary = non_transactional.summarize();

    let team_rows = issues.summarize_by_team(&settings.open_statuses);

    let today = local_today(settings.timezone_offset_hours);
    let tally = tally_resolved(&redmine, &issues, &settings, today).await;

    let html = render_document(
        &trx_summary.to_category_table(
            Category::Transactional.title(),
            &owners,
            settings.highlight_threshold,
        ),
        &non_trx_summary.to_category_table(
            Category::NonTransactional.title(),
            &owners,
            settings.highlight_threshold,
        ),
        &team_rows.to_team_table(),
        &tally.to_resolved_table(&today),
    );
    fs::write(&args.report_path, html)?;

    write_category_csv(
        &args.trx_csv_path,
        &prepared,
        Category::Transactional,
        &args.tracker_url,
    )?;
    write_category_csv(
        &args.non_trx_csv_path,
        &prepared,
        Category::NonTransactional,
        &args.tracker_url,
    )?;
    write_team_csv(
        &args.team_csv_path,
        &issues,
        &settings.open_statuses,
        &args.tracker_url,
    )?;

    Ok(())
}

async fn parse_configs(args: &Args) -> Result<(Settings, OwnerMapping)> {
    async fn parse_config<T, F>(path: &str, pb: &ProgressBar, parser: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        pb.set_message(format!("Read file `{}` ...", path));
        let parsed = parser(path)?;
        pb.finish_with_message(format!("✅ Completed parsing file `{}`", path));
        Ok(parsed)
    }

    let multi_progress = MultiProgress::default();
    let settings_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );
    let owners_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );

    let (settings, owners) = futures::join!(
        parse_config(&args.settings_path, &settings_pb, Settings::from_config),
        parse_config(&args.owners_path, &owners_pb, OwnerMapping::from_config),
    );
    Ok((settings?, owners?))
}

async fn fetch_mappings(redmine: &Redmine) -> (IndexMap<i64, String>, IndexMap<String, String>) {
    let multi_progress = MultiProgress::default();
    let types_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );
    let teams_pb = multi_progress.add_with_style(
        ProgressBar::no_length(),
        ProgressStyleTemplate::only_message(),
    );
    types_pb.set_message("Fetch `Issue Type` options ...");
    teams_pb.set_message("Fetch `Responsible Team` options ...");

    let (issue_types, teams) = futures::join!(redmine.issue_type_mapping(), redmine.team_mapping());

    // A missing mapping degrades labels, it never aborts the run.
    let issue_types = match issue_types {
        Ok(mapping) => {
            types_pb.finish_with_message(format!(
                "✅ Completed fetch `Issue Type` options (find {} codes)",
                mapping.len()
            ));
            mapping
        }
        Err(err) => {
            types_pb.finish_with_message(format!("⚠️ Failed fetch `Issue Type` options: {}", err));
            IndexMap::new()
        }
    };
    let teams = match teams {
        Ok(mapping) => {
            teams_pb.finish_with_message(format!(
                "✅ Completed fetch `Responsible Team` options (find {} teams)",
                mapping.len()
            ));
            mapping
        }
        Err(err) => {
            teams_pb.finish_with_message(format!(
                "⚠️ Failed fetch `Responsible Team` options: {}",
                err
            ));
            IndexMap::new()
        }
    };
    (issue_types, teams)
}

async fn fetch_snapshot(
    redmine: &Redmine,
    settings: &Settings,
    issue_types: &IndexMap<i64, String>,
    teams: &IndexMap<String, String>,
    snapshot_path: &str,
) -> Result<IssueSet> {
    let multi_progress = MultiProgress::default();
    let pages_pb = multi_progress.add_with_style(
        ProgressBar::new_spinner(),
        ProgressStyleTemplate::only_message(),
    );

    let progress_pb = pages_pb.clone();
    let progress = move |offset: usize| {
        progress_pb.set_message(format!("Fetch issues (offset {}) ...", offset));
    };
    let FetchOutcome { issues, warning } = redmine
        .fetch_issues(settings, issue_types, teams, Box::new(progress))
        .await;
    if let Some(warning) = &warning {
        multi_progress.println(format!("⚠️ {}", warning))?;
    }
    pages_pb.finish_with_message(format!(
        "✅ Completed fetch issues (find {} issues)",
        issues.len()
    ));

    Issue::snapshot_write(snapshot_path, &issues)?;
    Issue::snapshot_read(snapshot_path)
}

async fn tally_resolved(
    redmine: &Redmine,
    issues: &IssueSet,
    settings: &Settings,
    today: NaiveDate,
) -> ResolvedTally {
    let resolved = resolved_today(issues, settings.timezone_offset_hours, today);

    let multi_progress = MultiProgress::default();
    let pb = multi_progress.add_with_style(
        ProgressBar::new(resolved.len() as u64),
        ProgressStyleTemplate::count_bar(),
    );
    pb.set_message("Resolved-by lookup");

    let mut tally = ResolvedTally::default();
    for issue in resolved {
        tally.add(redmine.resolved_by(issue.id).await);
        pb.inc(1);
        tokio::time::sleep(Duration::from_millis(settings.fetch_delay_ms)).await;
    }
    pb.finish_with_message(format!(
        "✅ Completed resolved-by lookups (find {} resolved today)",
        tally.total()
    ));
    tally
}

fn filter_category(prepared: &[PreparedIssue], category: Category) -> Vec<PreparedIssue> {
    prepared
        .iter()
        .filter(|item| item.category == category)
        .cloned()
        .collect()
}
