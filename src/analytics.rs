use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ReportStatRow, ReportStatus};

#[derive(Debug, Clone)]
pub struct AnalyticsSummary {
    pub total: usize,
    pub resolved: usize,
    pub resolution_rate: i64,
    pub by_fault_type: Vec<(String, usize)>,
    pub by_issue_type: Vec<(String, usize)>,
    pub by_severity: Vec<(String, usize)>,
}

/// Rounded percentage of reports whose terminal state is resolved.
pub fn resolution_rate(resolved: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((resolved as f64 / total as f64) * 100.0).round() as i64
}

pub fn summarize(rows: &[ReportStatRow]) -> AnalyticsSummary {
    let resolved = rows
        .iter()
        .filter(|r| r.status == ReportStatus::Resolved)
        .count();

    AnalyticsSummary {
        total: rows.len(),
        resolved,
        resolution_rate: resolution_rate(resolved, rows.len()),
        by_fault_type: count_by(rows, |r| r.fault_type.as_str().to_string()),
        by_issue_type: count_by(rows, |r| {
            r.issue_type
                .clone()
                .unwrap_or_else(|| "unspecified".to_string())
        }),
        by_severity: count_by(rows, |r| r.severity.clone()),
    }
}

fn count_by(
    rows: &[ReportStatRow],
    key: impl Fn(&ReportStatRow) -> String,
) -> Vec<(String, usize)> {
    let mut map: HashMap<String, usize> = HashMap::new();
    for row in rows {
        *map.entry(key(row)).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = map.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
}

pub fn render_summary(
    summary: &AnalyticsSummary,
    from: NaiveDate,
    to: NaiveDate,
    collector_id: Option<i64>,
) -> String {
    let mut output = String::new();
    let scope = match collector_id {
        Some(id) => format!("collector {id}"),
        None => "all collectors".to_string(),
    };

    let _ = writeln!(output, "# Missed Collection Analytics");
    let _ = writeln!(output, "Window {from} to {to}, {scope}");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} reports, {} resolved ({}% resolution rate)",
        summary.total, summary.resolved, summary.resolution_rate
    );

    for (heading, counts) in [
        ("## By Fault Type", &summary.by_fault_type),
        ("## By Issue Type", &summary.by_issue_type),
        ("## By Severity", &summary.by_severity),
    ] {
        let _ = writeln!(output);
        let _ = writeln!(output, "{heading}");
        if counts.is_empty() {
            let _ = writeln!(output, "No reports in this window.");
        } else {
            for (key, count) in counts.iter() {
                let _ = writeln!(output, "- {key}: {count}");
            }
        }
    }

    output
}
