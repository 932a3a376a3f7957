pub mod aggregator;
pub mod changes;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod locator;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod runtime;
pub mod session_parser;
pub mod types;

use clap::{error::ErrorKind, Parser};
use config::{absolutize_path, load_config, CliOverrides, EnvMap};
use errors::LearningsError;
use logging::{install_run_logger, JsonlLogger};
use pipeline::{run_pipeline, PipelineRequest, RunSummary};
use runtime::ProductionRuntime;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "session-learnings")]
#[command(about = "Mine k8s troubleshooting sessions into a knowledge base")]
pub struct Cli {
    /// Directory holding session summaries and session directories
    pub session_dir: PathBuf,
    /// Where to write the knowledge base
    pub output_file: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Print the knowledge base instead of writing it
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn run() -> Result<i32, LearningsError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let env = std::env::vars_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| LearningsError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &env, &cwd, &runtime).map(|_| 0)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    env: &[(std::ffi::OsString, std::ffi::OsString)],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<Option<RunSummary>, LearningsError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(None);
            }
            _ => return Err(LearningsError::Cli(error.to_string())),
        },
    };

    let root = absolutize_path(cwd, &cli.session_dir);
    if !runtime.file_system.is_dir(&root) {
        return Err(LearningsError::MissingRoot(root));
    }

    let overrides = CliOverrides {
        config_path: cli.config.as_deref().map(|p| absolutize_path(cwd, p)),
        output_path: cli.output_file.clone(),
    };
    let cfg = load_config(&overrides, &env_to_map(env), runtime.file_system.as_ref())?;

    if let Some(log_path) = &cfg.logging.run_log_path {
        let mut logger = JsonlLogger::new(absolutize_path(cwd, log_path));
        logger.max_payload_bytes = cfg.logging.max_payload_bytes;
        install_run_logger(logger);
    }

    let request = PipelineRequest {
        root,
        output: absolutize_path(cwd, &cfg.report.output_path),
        limits: cfg.report_limits(),
        dry_run: cli.dry_run,
    };
    run_pipeline(runtime, &request).map(Some)
}

fn env_to_map(env: &[(std::ffi::OsString, std::ffi::OsString)]) -> EnvMap {
    let mut map = EnvMap::new();
    for (key, value) in env {
        if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::{run_with_runtime, Cli};
    use crate::errors::LearningsError;
    use crate::runtime::{FakeClock, FakeFileSystem, FakeTerminal, ProductionRuntime};
    use clap::CommandFactory;
    use std::ffi::OsString;
    use std::path::Path;
    use std::sync::Arc;

    fn args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    fn runtime(fs: &FakeFileSystem) -> ProductionRuntime {
        ProductionRuntime {
            clock: Arc::new(FakeClock::default()),
            file_system: Arc::new(fs.clone()),
            terminal: Arc::new(FakeTerminal::default()),
        }
    }

    #[test]
    fn relative_paths_resolve_against_working_directory() {
        let fs = FakeFileSystem::with_file(
            "/work/sessions/k8s-session-summary-1.txt",
            "Jira Ticket: OPS-3\n",
        );
        let summary = run_with_runtime(
            &args(&["session-learnings", "sessions", "kb/out.md"]),
            &[],
            Path::new("/work"),
            &runtime(&fs),
        )
        .expect("run")
        .expect("summary");
        assert_eq!(summary.output_path.as_deref(), Some(Path::new("/work/kb/out.md")));
        assert!(fs.file(Path::new("/work/kb/out.md")).is_some());
    }

    #[test]
    fn default_output_comes_from_config_defaults() {
        let fs = FakeFileSystem::with_file("/work/s/k8s-session-summary-1.txt", "Date: x\n");
        run_with_runtime(
            &args(&["session-learnings", "/work/s"]),
            &[],
            Path::new("/work"),
            &runtime(&fs),
        )
        .expect("run");
        assert!(fs.file(Path::new("/work/session-knowledge.md")).is_some());
    }

    #[test]
    fn output_env_var_applies_when_no_positional_output() {
        let fs = FakeFileSystem::with_file("/work/s/k8s-session-summary-1.txt", "Date: x\n");
        run_with_runtime(
            &args(&["session-learnings", "/work/s"]),
            &[(
                OsString::from("SESSION_LEARNINGS_OUTPUT"),
                OsString::from("/reports/kb.md"),
            )],
            Path::new("/work"),
            &runtime(&fs),
        )
        .expect("run");
        assert!(fs.file(Path::new("/reports/kb.md")).is_some());
    }

    #[test]
    fn missing_session_dir_argument_is_a_cli_error() {
        let err = run_with_runtime(
            &args(&["session-learnings"]),
            &[],
            Path::new("/work"),
            &runtime(&FakeFileSystem::default()),
        )
        .expect_err("usage");
        assert!(matches!(err, LearningsError::Cli(_)));
    }

    fn render_help() -> String {
        Cli::command().render_long_help().to_string()
    }

    #[test]
    fn missing_root_is_reported_before_config_is_read() {
        let fs = FakeFileSystem::with_file("/work/bad.toml", "[report\n");
        let err = run_with_runtime(
            &args(&["session-learnings", "absent", "--config", "bad.toml"]),
            &[],
            Path::new("/work"),
            &runtime(&fs),
        )
        .expect_err("missing root");
        assert!(matches!(err, LearningsError::MissingRoot(ref p) if p == Path::new("/work/absent")));
        assert!(fs.reads().is_empty());
    }

    #[test]
    fn help_mentions_dry_run_and_config() {
        let help = render_help();
        assert!(help.contains("--dry-run"));
        assert!(help.contains("--config"));
    }
}
