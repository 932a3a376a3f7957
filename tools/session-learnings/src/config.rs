use crate::errors::LearningsError;
use crate::logging::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::report::ReportLimits;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_PATH: &str = "session-knowledge.md";
pub const OUTPUT_ENV_VAR: &str = "SESSION_LEARNINGS_OUTPUT";

pub type EnvMap = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    pub namespace_limit: usize,
    pub learnings_limit: usize,
    pub resources_limit: usize,
    pub problem_chars: usize,
    pub root_cause_chars: usize,
    pub solution_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub run_log_path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let limits = ReportLimits::default();
        Self {
            report: ReportConfig {
                output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
                namespace_limit: limits.namespaces,
                learnings_limit: limits.key_learnings,
                resources_limit: limits.resources,
                problem_chars: limits.problem_chars,
                root_cause_chars: limits.root_cause_chars,
                solution_chars: limits.solution_chars,
            },
            logging: LoggingConfig {
                run_log_path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
        }
    }
}

impl AppConfig {
    pub fn report_limits(&self) -> ReportLimits {
        ReportLimits {
            namespaces: self.report.namespace_limit,
            key_learnings: self.report.learnings_limit,
            resources: self.report.resources_limit,
            problem_chars: self.report.problem_chars,
            root_cause_chars: self.report.root_cause_chars,
            solution_chars: self.report.solution_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    report: Option<PartialReportConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialReportConfig {
    output_path: Option<PathBuf>,
    namespace_limit: Option<usize>,
    learnings_limit: Option<usize>,
    resources_limit: Option<usize>,
    problem_chars: Option<usize>,
    root_cause_chars: Option<usize>,
    solution_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    run_log_path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

/// Defaults, then the config file, then the environment, then CLI flags.
pub fn load_config(
    overrides: &CliOverrides,
    env: &EnvMap,
    fs: &dyn FileSystem,
) -> Result<AppConfig, LearningsError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| LearningsError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    if let Some(output) = env.get(OUTPUT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        cfg.report.output_path = PathBuf::from(output);
    }

    if let Some(output) = &overrides.output_path {
        cfg.report.output_path = output.clone();
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(report) = partial.report {
        if let Some(value) = report.output_path {
            cfg.report.output_path = value;
        }
        if let Some(value) = report.namespace_limit {
            cfg.report.namespace_limit = value;
        }
        if let Some(value) = report.learnings_limit {
            cfg.report.learnings_limit = value;
        }
        if let Some(value) = report.resources_limit {
            cfg.report.resources_limit = value;
        }
        if let Some(value) = report.problem_chars {
            cfg.report.problem_chars = value;
        }
        if let Some(value) = report.root_cause_chars {
            cfg.report.root_cause_chars = value;
        }
        if let Some(value) = report.solution_chars {
            cfg.report.solution_chars = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(value) = logging.run_log_path {
            cfg.logging.run_log_path = Some(value);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

/// Resolves a relative config path against the process working directory.
pub fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), LearningsError> {
    if cfg.report.output_path.as_os_str().is_empty() {
        return Err(LearningsError::InvalidConfig(
            "report.output_path must not be empty".to_string(),
        ));
    }

    let limits = [
        ("report.namespace_limit", cfg.report.namespace_limit),
        ("report.learnings_limit", cfg.report.learnings_limit),
        ("report.resources_limit", cfg.report.resources_limit),
        ("report.problem_chars", cfg.report.problem_chars),
        ("report.root_cause_chars", cfg.report.root_cause_chars),
        ("report.solution_chars", cfg.report.solution_chars),
        ("logging.max_payload_bytes", cfg.logging.max_payload_bytes),
    ];
    for (key, value) in limits {
        if value == 0 {
            return Err(LearningsError::InvalidConfig(format!(
                "{key} must be greater than zero"
            )));
        }
    }

    Ok(())
}
