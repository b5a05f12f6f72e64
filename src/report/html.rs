use chrono::NaiveDate;

use crate::analyze::{IssueSummary, ResolvedTally, SummaryRow, TeamRollupRow};
use crate::model::OwnerMapping;

const NO_DATA_PLACEHOLDER: &str = "<p>No data available.</p>";

const STYLE: &str = r#"
body {
    font-family: Calibri, sans-serif;
    font-size: 14px;
    color: #000;
}
table {
    border-collapse: collapse;
    width: 100%;
    text-align: center;
    font-size: 14px;
}
th, td {
    border: 1px solid #555555;
    padding: 5px;
    color: #000;
}
th {
    background-color: #dedfe0;
    font-weight: bold;
}
tr:nth-child(even) td {
    background-color: #fdf8ff;
}
.grand-total {
    font-weight: bold;
    background-color: #dedfe0;
}
td[colspan], th[colspan] {
    text-align: center;
}
.category-cell {
    font-weight: bold;
    background-color: #dedfe0;
    writing-mode: vertical-lr;
    text-align: center;
    vertical-align: middle;
}
.owner-cell {
    font-style: italic;
    font-weight: bold;
    background-color: #fdf8ff;
    text-align: center;
    vertical-align: middle;
}
td:nth-child(3) {
    text-align: left;
}
"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One rendered table row with its span metadata. Spans are resolved before
/// any markup is emitted: the category cell needs the total row count and the
/// owner cell needs its block length up front.
struct RenderRow<'a> {
    category_span: Option<usize>,
    owner_span: Option<(&'a str, usize)>,
    row: &'a SummaryRow,
}

fn build_row_model<'a>(summary: &'a IssueSummary, mapping: &'a OwnerMapping) -> Vec<RenderRow<'a>> {
    let owner_blocks = mapping
        .owners
        .iter()
        .map(|owner| {
            let labels = owner.labels();
            let rows = summary
                .rows
                .iter()
                .filter(|row| labels.contains(&row.issue_type.as_str()))
                .collect::<Vec<_>>();
            (owner.name.as_str(), rows)
        })
        .filter(|(_, rows)| !rows.is_empty())
        .collect::<Vec<_>>();

    let total_rows: usize = owner_blocks.iter().map(|(_, rows)| rows.len()).sum();

    let mut model = Vec::with_capacity(total_rows);
    for (owner, rows) in owner_blocks {
        let owner_len = rows.len();
        for (index, row) in rows.into_iter().enumerate() {
            model.push(RenderRow {
                category_span: if model.is_empty() { Some(total_rows) } else { None },
                owner_span: if index == 0 { Some((owner, owner_len)) } else { None },
                row,
            });
        }
    }
    model
}

pub trait CategoryTable {
    fn to_category_table(&self, title: &str, mapping: &OwnerMapping, highlight_threshold: usize)
        -> String;
}

impl CategoryTable for IssueSummary {
    fn to_category_table(
        &self,
        title: &str,
        mapping: &OwnerMapping,
        highlight_threshold: usize,
    ) -> String {
        if self.rows.is_empty() {
            return NO_DATA_PLACEHOLDER.to_string();
        }

        let model = build_row_model(self, mapping);

        let mut html = String::new();
        html.push_str(&format!("<p><strong>{}:</strong></p>\n", escape(title)));
        html.push_str("<table>\n<thead>\n<tr><th>Category</th><th>Owner</th><th>Issue Type</th>");
        for week in &self.weeks {
            html.push_str(&format!("<th>{}</th>", week));
        }
        html.push_str("<th>Grand Total</th></tr>\n</thead>\n<tbody>\n");

        for entry in &model {
            html.push_str("<tr>");
            if let Some(span) = entry.category_span {
                html.push_str(&format!(
                    "<td class='category-cell' rowspan='{}'>{}</td>",
                    span,
                    escape(title)
                ));
            }
            if let Some((owner, span)) = entry.owner_span {
                html.push_str(&format!(
                    "<td class='owner-cell' rowspan='{}'>{}</td>",
                    span,
                    escape(owner)
                ));
            }

            let row = entry.row;
            let highlight = row.grand_total > highlight_threshold;
            if highlight {
                html.push_str(&format!(
                    "<td style='color:red'><b>{}</b></td>",
                    escape(&row.issue_type)
                ));
            } else {
                html.push_str(&format!("<td>{}</td>", escape(&row.issue_type)));
            }
            for week in &self.weeks {
                html.push_str(&format!(
                    "<td>{}</td>",
                    row.week_counts.get(week).copied().unwrap_or(0)
                ));
            }
            if highlight {
                html.push_str(&format!("<td style='color:red'><b>{}</b></td>", row.grand_total));
            } else {
                html.push_str(&format!("<td>{}</td>", row.grand_total));
            }
            html.push_str("</tr>\n");
        }

        // The trailing totals sum the whole input frame, not just the rows
        // that matched an owner bucket.
        html.push_str("<tr class='grand-total'>");
        html.push_str("<td colspan='2'><b>Grand Total</b></td><td><b>All Issues</b></td>");
        for week in &self.weeks {
            html.push_str(&format!("<td><b>{}</b></td>", self.week_total(week)));
        }
        html.push_str(&format!("<td><b>{}</b></td>", self.grand_total()));
        html.push_str("</tr>\n</tbody>\n</table>\n<br>\n");
        html
    }
}

pub trait TeamTable {
    fn to_team_table(&self) -> String;
}

impl TeamTable for [TeamRollupRow] {
    fn to_team_table(&self) -> String {
        if self.is_empty() {
            return "<p><strong>Responsible Team Summary:</strong> No data available.</p>"
                .to_string();
        }

        let mut html = String::new();
        html.push_str(
            "<p><strong>Responsible Team Summary (New / In Progress / Open):</strong></p>\n",
        );
        html.push_str("<table style=\"border-collapse: collapse; width: 100%; font-size: 13px;\">\n");
        html.push_str("<thead>\n<tr style=\"background-color:#e7e6e6;\">");
        html.push_str("<th style=\"border: 1px solid #999; padding: 4px;\">Issue Type</th>");
        html.push_str("<th style=\"border: 1px solid #999; padding: 4px;\">Responsible Team</th>");
        html.push_str("<th style=\"border: 1px solid #999; padding: 4px;\">Total Count</th>");
        html.push_str("</tr>\n</thead>\n<tbody>\n");

        for row in self {
            html.push_str("<tr>");
            html.push_str(&format!(
                "<td style=\"border: 1px solid #999; padding: 4px;\">{}</td>",
                escape(&row.issue_type)
            ));
            html.push_str(&format!(
                "<td style=\"border: 1px solid #999; padding: 4px;\">{}</td>",
                escape(&row.responsible_team)
            ));
            html.push_str(&format!(
                "<td style=\"border: 1px solid #999; padding: 4px;\">{}</td>",
                row.count
            ));
            html.push_str("</tr>\n");
        }

        let grand_total: usize = self.iter().map(|row| row.count).sum();
        html.push_str("<tr style=\"background-color:#e7e6e6; font-weight:bold;\">");
        html.push_str("<td style=\"border: 1px solid #999; padding: 4px;\">Grand Total</td>");
        html.push_str("<td style=\"border: 1px solid #999; padding: 4px;\"></td>");
        html.push_str(&format!(
            "<td style=\"border: 1px solid #999; padding: 4px;\">{}</td>",
            grand_total
        ));
        html.push_str("</tr>\n</tbody>\n</table>\n<br>\n");
        html
    }
}

pub trait ResolvedTable {
    fn to_resolved_table(&self, report_date: &NaiveDate) -> String;
}

impl ResolvedTable for ResolvedTally {
    fn to_resolved_table(&self, report_date: &NaiveDate) -> String {
        let mut html = String::new();
        html.push_str(&format!(
            "<h3 style='font-size:14px;margin-bottom:5px;'>Resolved Issues Summary by User for {}</h3>\n",
            report_date
        ));
        html.push_str("<table style='border-collapse:collapse;width:60%;font-size:12px;'>\n");
        html.push_str("<tr style='background-color:#d9d9d9;font-weight:bold'>");
        html.push_str("<th style='border:1px solid #ccc;padding:2px 4px;'>Resolved By</th>");
        html.push_str(
            "<th style='border:1px solid #ccc;padding:2px 4px;'>Today Total Resolved Count</th>",
        );
        html.push_str("</tr>\n");

        for (resolver, count) in self.iter() {
            html.push_str("<tr>");
            html.push_str(&format!(
                "<td style='border:1px solid #ccc;padding:2px 4px;font-size:12px'>{}</td>",
                escape(resolver.label())
            ));
            html.push_str(&format!(
                "<td style='border:1px solid #ccc;padding:2px 4px;text-align:center;font-size:12px'>{}</td>",
                count
            ));
            html.push_str("</tr>\n");
        }

        html.push_str("<tr style='background-color:#e0ebf5;font-weight:bold'>");
        html.push_str("<td style='border:1px solid #ccc;padding:2px 4px;font-size:12px'>Total</td>");
        html.push_str(&format!(
            "<td style='border:1px solid #ccc;padding:2px 4px;text-align:center;font-size:12px'>{}</td>",
            self.total()
        ));
        html.push_str("</tr>\n</table>\n");
        html
    }
}

/// The full email body: embedded stylesheet, intro line, then the four tables.
pub fn render_document(
    transactional: &str,
    non_transactional: &str,
    team: &str,
    resolved: &str,
) -> String {
    format!(
        "<html>\n<head>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <p>Please see the summary of weekly based pending issues.</p>\n\n\
         {transactional}\n<br><br>\n\n{non_transactional}\n<br><br>\n\n{team}\n<br><br>\n{resolved}\n\
         </body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redmine::Resolver;
    use indexmap::IndexMap;

    fn summary_row(owner: &str, issue_type: &str, counts: &[(&str, usize)]) -> SummaryRow {
        let week_counts = counts
            .iter()
            .map(|(week, count)| (week.to_string(), *count))
            .collect::<IndexMap<_, _>>();
        let grand_total = week_counts.values().sum();
        SummaryRow {
            assigned_to: owner.to_string(),
            issue_type: issue_type.to_string(),
            week_counts,
            grand_total,
        }
    }

    fn mapping() -> OwnerMapping {
        OwnerMapping {
            owners: vec![
                crate::model::Owner {
                    name: "Nur".to_string(),
                    issue_types: vec![
                        (70, "Account blocked".to_string()),
                        (96, "OTP issue".to_string()),
                    ],
                },
                crate::model::Owner {
                    name: "Shafiul".to_string(),
                    issue_types: vec![(74, "Bank - Money out".to_string())],
                },
            ],
        }
    }

    fn summary(rows: Vec<SummaryRow>) -> IssueSummary {
        IssueSummary {
            weeks: vec!["W00".to_string(), "W01".to_string()],
            rows,
        }
    }

    #[test]
    fn empty_summary_renders_placeholder() {
        let html = IssueSummary::default().to_category_table("Transactional", &mapping(), 50);
        assert_eq!(html, NO_DATA_PLACEHOLDER);
    }

    #[test]
    fn category_span_covers_all_rendered_rows() {
        let rows = vec![
            summary_row("Tech Ops", "Account blocked", &[("W00", 1), ("W01", 2)]),
            summary_row("Tech Ops", "OTP issue", &[("W00", 3), ("W01", 0)]),
            summary_row("Tech Ops", "Bank - Money out", &[("W00", 0), ("W01", 4)]),
        ];
        let html = summary(rows).to_category_table("Non-Transactional", &mapping(), 50);

        assert!(html.contains("<td class='category-cell' rowspan='3'>Non-Transactional</td>"));
        assert!(html.contains("<td class='owner-cell' rowspan='2'>Nur</td>"));
        assert!(html.contains("<td class='owner-cell' rowspan='1'>Shafiul</td>"));
        assert_eq!(html.matches("category-cell").count(), 1);
    }

    #[test]
    fn owners_without_rows_are_skipped() {
        let rows = vec![summary_row("Tech Ops", "Bank - Money out", &[("W00", 1), ("W01", 0)])];
        let html = summary(rows).to_category_table("Transactional", &mapping(), 50);

        assert!(!html.contains("Nur"));
        assert!(html.contains("<td class='category-cell' rowspan='1'>Transactional</td>"));
    }

    #[test]
    fn rows_above_threshold_are_highlighted() {
        let rows = vec![
            summary_row("Tech Ops", "Account blocked", &[("W00", 30), ("W01", 21)]),
            summary_row("Tech Ops", "OTP issue", &[("W00", 50), ("W01", 0)]),
        ];
        let html = summary(rows).to_category_table("Transactional", &mapping(), 50);

        // 51 crosses the threshold, exactly 50 does not
        assert!(html.contains("<td style='color:red'><b>Account blocked</b></td>"));
        assert!(html.contains("<td style='color:red'><b>51</b></td>"));
        assert!(html.contains("<td>OTP issue</td>"));
        assert!(html.contains("<td>50</td>"));
    }

    #[test]
    fn grand_total_row_sums_the_entire_input_frame() {
        // The second row's issue type is in no owner bucket: it is not
        // rendered, but the totals still include it.
        let rows = vec![
            summary_row("Tech Ops", "Account blocked", &[("W00", 1), ("W01", 2)]),
            summary_row("Tech Ops", "Unmapped label", &[("W00", 10), ("W01", 10)]),
        ];
        let html = summary(rows).to_category_table("Transactional", &mapping(), 50);

        assert!(!html.contains("Unmapped label"));
        assert!(html.contains("<td><b>11</b></td>"));
        assert!(html.contains("<td><b>12</b></td>"));
        assert!(html.contains("<td><b>23</b></td>"));
    }

    #[test]
    fn team_table_lists_rows_and_total() {
        let rows = vec![
            TeamRollupRow {
                issue_type: "Bug".to_string(),
                responsible_team: "Core".to_string(),
                count: 2,
            },
            TeamRollupRow {
                issue_type: "OTP issue".to_string(),
                responsible_team: "Wallet".to_string(),
                count: 1,
            },
        ];
        let html = rows.to_team_table();

        assert!(html.contains("Bug"));
        assert!(html.contains("Wallet"));
        assert!(html.contains("Grand Total"));
        assert!(html.contains(">3</td>"));
    }

    #[test]
    fn empty_team_rollup_renders_placeholder() {
        let html = Vec::<TeamRollupRow>::new().to_team_table();
        assert!(html.contains("No data available."));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn resolved_table_keeps_distinct_error_and_unknown_rows() {
        let mut tally = ResolvedTally::default();
        tally.add(Resolver::Named("Rina".to_string()));
        tally.add(Resolver::Unknown);
        tally.add(Resolver::Error);
        let date = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
        let html = tally.to_resolved_table(&date);

        assert!(html.contains("2025-07-02"));
        assert!(html.contains(">Rina</td>"));
        assert!(html.contains(">Unknown</td>"));
        assert!(html.contains(">Error</td>"));
        assert!(html.contains(">Total</td>"));
    }

    #[test]
    fn document_embeds_all_sections() {
        let html = render_document("<p>TRX</p>", "<p>NON</p>", "<p>TEAM</p>", "<p>RESOLVED</p>");
        assert!(html.contains("<style>"));
        assert!(html.contains("<p>TRX</p>"));
        assert!(html.contains("<p>NON</p>"));
        assert!(html.contains("<p>TEAM</p>"));
        assert!(html.contains("<p>RESOLVED</p>"));
    }
}
