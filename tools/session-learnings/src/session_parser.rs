use crate::changes::parse_change_manifest;
use crate::logging::append_run_log;
use crate::runtime::FileSystem;
use crate::types::{ArtifactPair, SessionRecord};
use regex::Regex;
use serde_json::json;
use std::path::Path;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date:[ \t]*(\S.*)").expect("date pattern"));
#[allow(clippy::expect_used)]
static TICKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Jira Ticket:[ \t]*(\S.*)").expect("ticket pattern"));
#[allow(clippy::expect_used)]
static NAMESPACES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Affected Namespaces:[ \t]*(\S.*)").expect("namespaces pattern"));

pub const PROBLEM_DESCRIPTION: &str = "Problem Description";
pub const INVESTIGATION: &str = "Investigation";
pub const ROOT_CAUSE: &str = "Root Cause";
pub const SOLUTION: &str = "Solution";
pub const PREVENTION: &str = "Prevention";
pub const RESOURCES_MODIFIED: &str = "Resources Modified";
pub const KEY_LEARNINGS: &str = "Key Learnings";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryMetadata {
    pub date: Option<String>,
    pub jira_ticket: Option<String>,
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSections {
    pub problem_description: Option<String>,
    pub investigation: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub prevention: Option<String>,
    pub resources_modified: Vec<String>,
    pub key_learnings: Vec<String>,
}

/// Builds one record from an artifact pair. Unreadable or missing files leave
/// their fields empty. A change manifest only fills Resources Modified when
/// the learning report did not list any.
pub fn parse_session(fs: &dyn FileSystem, pair: &ArtifactPair) -> SessionRecord {
    let metadata = read_optional(fs, &pair.summary)
        .map(|text| parse_summary(&text))
        .unwrap_or_default();
    let sections = pair
        .learning_report
        .as_deref()
        .and_then(|path| read_optional(fs, path))
        .map(|text| parse_learning_report(&text))
        .unwrap_or_default();
    let resources_modified = if sections.resources_modified.is_empty() {
        pair.change_manifest
            .as_deref()
            .map(|path| manifest_resources(fs, path))
            .unwrap_or_default()
    } else {
        sections.resources_modified
    };

    let record = SessionRecord {
        date: metadata.date,
        jira_ticket: metadata.jira_ticket,
        problem_description: sections.problem_description,
        investigation: sections.investigation,
        root_cause: sections.root_cause,
        solution: sections.solution,
        prevention: sections.prevention,
        resources_modified,
        key_learnings: sections.key_learnings,
        namespaces: metadata.namespaces,
    };
    append_run_log(
        "debug",
        "parser.session.parsed",
        json!({
            "summary": pair.summary.display().to_string(),
            "has_learning_report": pair.learning_report.is_some(),
            "jira_ticket": record.jira_ticket,
            "namespaces": record.namespaces.len(),
            "key_learnings": record.key_learnings.len(),
        }),
    );
    record
}

pub fn parse_summary(text: &str) -> SummaryMetadata {
    SummaryMetadata {
        date: capture_line(&DATE_PATTERN, text),
        jira_ticket: capture_line(&TICKET_PATTERN, text),
        namespaces: capture_line(&NAMESPACES_PATTERN, text)
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    }
}

pub fn parse_learning_report(text: &str) -> ReportSections {
    ReportSections {
        problem_description: section_body(text, PROBLEM_DESCRIPTION),
        investigation: section_body(text, INVESTIGATION),
        root_cause: section_body(text, ROOT_CAUSE),
        solution: section_body(text, SOLUTION),
        prevention: section_body(text, PREVENTION),
        resources_modified: section_bullets(text, RESOURCES_MODIFIED),
        key_learnings: section_bullets(text, KEY_LEARNINGS),
    }
}

/// Trimmed text between `## <name>` and the next second-level heading.
pub fn section_body(text: &str, name: &str) -> Option<String> {
    let mut lines = text.lines();
    lines.by_ref().find(|line| is_heading(line, name))?;
    let body = lines
        .take_while(|line| !line.starts_with("## "))
        .collect::<Vec<_>>()
        .join("\n");
    Some(body.trim().to_string())
}

/// `-` bullet lines of a section with the marker stripped, in source order.
pub fn section_bullets(text: &str, name: &str) -> Vec<String> {
    let Some(body) = section_body(text, name) else {
        return Vec::new();
    };
    body.lines()
        .filter_map(|line| line.trim_start().strip_prefix('-'))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_heading(line: &str, name: &str) -> bool {
    line.strip_prefix("## ")
        .is_some_and(|title| title.trim() == name)
}

fn capture_line(pattern: &Regex, text: &str) -> Option<String> {
    let value = pattern.captures(text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn manifest_resources(fs: &dyn FileSystem, path: &Path) -> Vec<String> {
    let Some(text) = read_optional(fs, path) else {
        return Vec::new();
    };
    match parse_change_manifest(&text) {
        Ok(resources) => {
            append_run_log(
                "debug",
                "parser.change_manifest.parsed",
                json!({
                    "path": path.display().to_string(),
                    "resources": resources,
                }),
            );
            resources.iter().map(|resource| resource.label()).collect()
        }
        Err(err) => {
            append_run_log(
                "warn",
                "parser.change_manifest.failed",
                json!({
                    "path": path.display().to_string(),
                    "error": err.to_string(),
                }),
            );
            Vec::new()
        }
    }
}

fn read_optional(fs: &dyn FileSystem, path: &Path) -> Option<String> {
    if !fs.is_file(path) {
        return None;
    }
    match fs.read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            append_run_log(
                "warn",
                "parser.read.failed",
                json!({
                    "path": path.display().to_string(),
                    "error": err.to_string(),
                }),
            );
            None
        }
    }
}
