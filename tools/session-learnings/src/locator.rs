use crate::changes::change_manifest_name;
use crate::errors::LearningsError;
use crate::logging::append_run_log;
use crate::runtime::FileSystem;
use crate::types::ArtifactPair;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const LEGACY_SUMMARY_PREFIX: &str = "k8s-session-summary-";
pub const LEGACY_SUMMARY_SUFFIX: &str = ".txt";
pub const SESSION_SUMMARY_FILE: &str = "k8s-session-summary.txt";
pub const LEARNING_REPORT_FILE: &str = "session-learning-report.md";
pub const TROUBLESHOOTER_DIR: &str = "k8s-troubleshooter";

/// Finds every summary under `root` and pairs it with a learning report when
/// one can be found. Legacy root-level summaries come first, then per-session
/// directories in enumeration order.
pub fn discover_artifacts(
    fs: &dyn FileSystem,
    root: &Path,
) -> Result<Vec<ArtifactPair>, LearningsError> {
    if !fs.is_dir(root) {
        return Err(LearningsError::MissingRoot(root.to_path_buf()));
    }

    let legacy = legacy_summaries(fs, root)?;
    let session_dirs = session_directories(fs, root)?;

    let mut pairs = Vec::with_capacity(legacy.len() + session_dirs.len());
    for summary in legacy {
        let learning_report = pair_legacy_summary(fs, root, &summary, &session_dirs);
        let change_manifest = legacy_change_manifest(fs, &summary);
        append_run_log(
            "debug",
            "locator.legacy_summary.found",
            json!({
                "summary": summary.display().to_string(),
                "learning_report": learning_report.as_ref().map(|p| p.display().to_string()),
                "change_manifest": change_manifest.as_ref().map(|p| p.display().to_string()),
            }),
        );
        pairs.push(ArtifactPair {
            summary,
            learning_report,
            change_manifest,
        });
    }

    for dir in &session_dirs {
        let summary = dir.join(SESSION_SUMMARY_FILE);
        if !fs.is_file(&summary) {
            continue;
        }
        let report = dir.join(LEARNING_REPORT_FILE);
        let learning_report = fs.is_file(&report).then_some(report);
        append_run_log(
            "debug",
            "locator.session_dir.found",
            json!({
                "session_dir": dir.display().to_string(),
                "has_learning_report": learning_report.is_some(),
            }),
        );
        pairs.push(ArtifactPair {
            summary,
            learning_report,
            change_manifest: None,
        });
    }

    Ok(pairs)
}

/// Timestamp token of a legacy summary file name, e.g. `20240101-1200` for
/// `k8s-session-summary-20240101-1200.txt`. The token may be empty.
pub fn legacy_token(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(LEGACY_SUMMARY_PREFIX)?
        .strip_suffix(LEGACY_SUMMARY_SUFFIX)
}

fn legacy_summaries(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>, LearningsError> {
    Ok(fs
        .list_dir(root)?
        .into_iter()
        .filter(|path| fs.is_file(path))
        .filter(|path| file_name(path).and_then(legacy_token).is_some())
        .collect())
}

/// Children of the root and of `root/k8s-troubleshooter` whose names start
/// with `2` (year-prefixed timestamps).
fn session_directories(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>, LearningsError> {
    let mut dirs = timestamped_children(fs, root)?;
    let nested = root.join(TROUBLESHOOTER_DIR);
    if fs.is_dir(&nested) {
        match timestamped_children(fs, &nested) {
            Ok(children) => dirs.extend(children),
            Err(err) => append_run_log(
                "warn",
                "locator.list_dir.failed",
                json!({
                    "path": nested.display().to_string(),
                    "error": err.to_string(),
                }),
            ),
        }
    }
    Ok(dirs)
}

fn timestamped_children(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>, LearningsError> {
    Ok(fs
        .list_dir(dir)?
        .into_iter()
        .filter(|path| fs.is_dir(path))
        .filter(|path| file_name(path).is_some_and(|name| name.starts_with('2')))
        .collect())
}

fn pair_legacy_summary(
    fs: &dyn FileSystem,
    root: &Path,
    summary: &Path,
    session_dirs: &[PathBuf],
) -> Option<PathBuf> {
    let parent = summary.parent()?;
    if parent != root {
        let sibling = parent.join(LEARNING_REPORT_FILE);
        return fs.is_file(&sibling).then_some(sibling);
    }

    let token = file_name(summary)
        .and_then(legacy_token)
        .filter(|token| !token.is_empty())?;
    // First directory containing the token wins, even if it has no report.
    let dir = session_dirs
        .iter()
        .find(|dir| file_name(dir).is_some_and(|name| name.contains(token)))?;
    let report = dir.join(LEARNING_REPORT_FILE);
    fs.is_file(&report).then_some(report)
}

fn legacy_change_manifest(fs: &dyn FileSystem, summary: &Path) -> Option<PathBuf> {
    let token = file_name(summary)
        .and_then(legacy_token)
        .filter(|token| !token.is_empty())?;
    let manifest = summary.parent()?.join(change_manifest_name(token));
    fs.is_file(&manifest).then_some(manifest)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
