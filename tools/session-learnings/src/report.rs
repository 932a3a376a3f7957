use crate::aggregator::{AggregateStatistics, CategoryBucket, NamespaceCount};
use crate::errors::LearningsError;
use crate::logging::append_run_log;
use crate::runtime::FileSystem;
use crate::types::SessionRecord;
use chrono::NaiveDateTime;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLimits {
    pub namespaces: usize,
    pub key_learnings: usize,
    pub resources: usize,
    pub problem_chars: usize,
    pub root_cause_chars: usize,
    pub solution_chars: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            namespaces: 10,
            key_learnings: 20,
            resources: 3,
            problem_chars: 200,
            root_cause_chars: 150,
            solution_chars: 150,
        }
    }
}

/// Renders the knowledge base. Output depends only on the arguments.
pub fn render_report(
    stats: &AggregateStatistics,
    records: &[SessionRecord],
    generated_at: NaiveDateTime,
    limits: &ReportLimits,
) -> String {
    let mut out = String::new();
    out.push_str("# K8s Troubleshooting Knowledge Base\n");
    out.push_str(&format!(
        "Last Updated: {}\n\n",
        generated_at.format(TIMESTAMP_FORMAT)
    ));
    out.push_str("## Session Statistics\n\n");
    out.push_str(&format!("Total Sessions Analyzed: {}\n\n", records.len()));

    out.push_str("## Common Problem Patterns\n\n");
    for bucket in categories_by_size(stats) {
        render_category(&mut out, bucket, limits);
    }

    out.push_str("## Namespace Activity Patterns\n\n");
    let namespaces = top_namespaces(stats, limits.namespaces);
    if namespaces.is_empty() {
        out.push_str("_No namespace data available._\n");
    }
    for entry in namespaces {
        out.push_str(&format!(
            "- {}: {} incident(s)\n",
            entry.namespace, entry.incidents
        ));
    }
    out.push('\n');

    out.push_str("## Key Learnings\n\n");
    let learnings = unique_learnings(stats.key_learnings(), limits.key_learnings);
    if learnings.is_empty() {
        out.push_str("_No key learnings recorded yet._\n");
    }
    for learning in learnings {
        out.push_str(&format!("- {learning}\n"));
    }
    out.push('\n');

    out.push_str(USAGE_FOOTER);

    append_run_log(
        "info",
        "report.render.completed",
        json!({
            "sessions": records.len(),
            "categories": stats.categories().len(),
            "output_bytes": out.len(),
        }),
    );
    out
}

const USAGE_FOOTER: &str = "## How to Use This Knowledge Base

1. Find the problem category that matches the symptoms you are seeing.
2. Read the past sessions in that category for root causes and fixes.
3. Check the namespace activity to spot recurring hot spots.
4. Apply the key learnings before making changes to the cluster.
";

/// Largest first; the stable sort keeps first-seen order among ties.
pub fn categories_by_size(stats: &AggregateStatistics) -> Vec<&CategoryBucket> {
    let mut buckets = stats.categories().iter().collect::<Vec<_>>();
    buckets.sort_by(|a, b| b.records.len().cmp(&a.records.len()));
    buckets
}

pub fn top_namespaces(stats: &AggregateStatistics, limit: usize) -> Vec<&NamespaceCount> {
    let mut counts = stats.namespaces().iter().collect::<Vec<_>>();
    counts.sort_by(|a, b| b.incidents.cmp(&a.incidents));
    counts.truncate(limit);
    counts
}

/// Deduplicates keeping the first occurrence, so reruns show the same list.
pub fn unique_learnings(learnings: &[String], limit: usize) -> Vec<&str> {
    let mut seen = HashSet::new();
    learnings
        .iter()
        .map(String::as_str)
        .filter(|learning| seen.insert(*learning))
        .take(limit)
        .collect()
}

pub fn truncate_chars(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn render_category(out: &mut String, bucket: &CategoryBucket, limits: &ReportLimits) {
    out.push_str(&format!("### {}\n", bucket.category));
    out.push_str(&format!("Occurrences: {}\n\n", bucket.records.len()));
    for record in &bucket.records {
        render_record(out, record, limits);
    }
}

fn render_record(out: &mut String, record: &SessionRecord, limits: &ReportLimits) {
    match record.ticket() {
        Some(ticket) => out.push_str(&format!("#### {ticket}\n")),
        None => out.push_str(&format!(
            "#### Session from {}\n",
            record.date.as_deref().unwrap_or("Unknown")
        )),
    }

    let fields = [
        ("Problem", &record.problem_description, limits.problem_chars),
        ("Root Cause", &record.root_cause, limits.root_cause_chars),
        ("Solution", &record.solution, limits.solution_chars),
    ];
    for (label, value, budget) in fields {
        if let Some(text) = value.as_deref().filter(|t| !t.is_empty()) {
            out.push_str(&format!("**{label}:** {}\n\n", truncate_chars(text, budget)));
        }
    }

    if !record.resources_modified.is_empty() {
        out.push_str("**Resources Modified:**\n");
        for resource in record.resources_modified.iter().take(limits.resources) {
            out.push_str(&format!("- {resource}\n"));
        }
        out.push('\n');
    }
    out.push_str("---\n\n");
}

pub fn write_report(
    fs: &dyn FileSystem,
    path: &Path,
    contents: &str,
) -> Result<(), LearningsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !fs.is_dir(parent) {
            fs.create_dir_all(parent)
                .map_err(|e| LearningsError::Write {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }
    }
    fs.write_string(path, contents)?;
    append_run_log(
        "info",
        "report.write.completed",
        json!({
            "path": path.display().to_string(),
            "output_bytes": contents.len(),
        }),
    );
    Ok(())
}
