use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearningsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("Error: Directory {} not found", .0.display())]
    MissingRoot(PathBuf),
    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("change manifest parse error: {0}")]
    ManifestParse(String),
    #[error("cli error: {0}")]
    Cli(String),
}
