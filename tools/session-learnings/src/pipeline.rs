use crate::aggregator::aggregate;
use crate::errors::LearningsError;
use crate::locator::discover_artifacts;
use crate::logging::append_run_log;
use crate::report::{render_report, write_report, ReportLimits};
use crate::runtime::ProductionRuntime;
use crate::session_parser::parse_session;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub root: PathBuf,
    pub output: PathBuf,
    pub limits: ReportLimits,
    /// Print the document instead of writing it.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sessions_analyzed: usize,
    pub problem_types: usize,
    pub namespaces_tracked: usize,
    pub output_path: Option<PathBuf>,
}

pub fn run_pipeline(
    runtime: &ProductionRuntime,
    request: &PipelineRequest,
) -> Result<RunSummary, LearningsError> {
    let fs = runtime.file_system.as_ref();
    let terminal = runtime.terminal.as_ref();
    append_run_log(
        "info",
        "pipeline.started",
        json!({
            "root": request.root.display().to_string(),
            "output": request.output.display().to_string(),
            "dry_run": request.dry_run,
        }),
    );

    if !fs.is_dir(&request.root) {
        return Err(LearningsError::MissingRoot(request.root.clone()));
    }

    let pairs = discover_artifacts(fs, &request.root)?;
    terminal.write_line(&format!("Found {} session summaries", pairs.len()))?;

    let mut records = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        records.push(parse_session(fs, pair));
        terminal.write_line(&format!(
            "Analyzed: {}",
            display_relative(&request.root, &pair.summary)
        ))?;
    }

    let stats = aggregate(&records);
    let document = render_report(
        &stats,
        &records,
        local_timestamp(runtime.clock.now()),
        &request.limits,
    );

    let output_path = if request.dry_run {
        terminal.write_line(&document)?;
        None
    } else {
        write_report(fs, &request.output, &document)?;
        terminal.write_line("")?;
        terminal.write_line(&format!(
            "Knowledge base written to: {}",
            request.output.display()
        ))?;
        Some(request.output.clone())
    };

    let summary = RunSummary {
        sessions_analyzed: records.len(),
        problem_types: stats.categories().len(),
        namespaces_tracked: stats.namespaces().len(),
        output_path,
    };
    terminal.write_line(&format!("  - Analyzed {} sessions", summary.sessions_analyzed))?;
    terminal.write_line(&format!("  - Identified {} problem types", summary.problem_types))?;
    terminal.write_line(&format!(
        "  - Tracked {} namespaces",
        summary.namespaces_tracked
    ))?;

    append_run_log(
        "info",
        "pipeline.completed",
        serde_json::to_value(&summary).unwrap_or_default(),
    );
    Ok(summary)
}

pub fn local_timestamp(now: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(now).naive_local()
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
