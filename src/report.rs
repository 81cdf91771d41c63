//! Markdown inventory report for a validation run.

use crate::validation::{Finding, Severity, Summary};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

const ACTIONS: [&str; 3] = [
    "Fix errors and rerun validation.",
    "Decide what to do with orphans (add consumer, deprecate, or document external consumer).",
    "Rebuild indexes after catalog changes.",
];

/// Render the report: summary, findings grouped by severity, orphans table,
/// and the actions checklist.
pub fn render_report(repo: &Path, date: NaiveDate, findings: &[Finding], summary: &Summary) -> String {
    let mut lines: Vec<String> = vec![
        "# Inventory Report".to_string(),
        String::new(),
        "## Summary".to_string(),
        format!("- Repo: {}", repo.display()),
        format!("- Date: {}", date.format("%Y-%m-%d")),
        format!("- Services cataloged: {}", summary.services),
        format!(
            "- Items: {} (events: {}, commands: {}, queries: {})",
            summary.items, summary.events, summary.commands, summary.queries
        ),
        String::new(),
        "## Findings".to_string(),
    ];

    for severity in Severity::ALL {
        let group: Vec<&Finding> = findings.iter().filter(|f| f.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        lines.push(format!("### {}", severity.as_str()));
        for finding in group {
            lines.push(format!("- **{}**: {}", finding.title, finding.detail));
        }
        lines.push(String::new());
    }

    lines.push("### Orphans".to_string());
    lines.push("| id | subject | producer | status |".to_string());
    lines.push("|---|---|---|---|".to_string());
    for orphan in &summary.orphans {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            orphan.id, orphan.subject, orphan.producer, orphan.status
        ));
    }

    lines.push(String::new());
    lines.push("## Actions".to_string());
    for (idx, action) in ACTIONS.iter().enumerate() {
        lines.push(format!("{}. {action}", idx + 1));
    }
    lines.push(String::new());

    lines.join("\n")
}

/// Write a rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing report {}", path.display()))
}
