use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ticket value the troubleshooter writes when no ticket was given.
pub const TICKET_NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    pub summary: PathBuf,
    pub learning_report: Option<PathBuf>,
    /// `k8s-changes-<token>.yaml` captured next to a legacy summary.
    pub change_manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: Option<String>,
    pub jira_ticket: Option<String>,
    pub problem_description: Option<String>,
    pub investigation: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub prevention: Option<String>,
    pub resources_modified: Vec<String>,
    pub key_learnings: Vec<String>,
    pub namespaces: Vec<String>,
}

impl SessionRecord {
    /// Ticket id suitable for a heading; `None` when absent or the sentinel.
    pub fn ticket(&self) -> Option<&str> {
        self.jira_ticket
            .as_deref()
            .filter(|ticket| *ticket != TICKET_NOT_SPECIFIED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    MemoryOom,
    CrashLoopBackOff,
    ImagePull,
    Scheduling,
    NetworkDns,
    ArgoCdSync,
    TektonPipeline,
    Crossplane,
    StoragePvc,
    RbacPermission,
    Configuration,
}

impl ProblemCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryOom => "Memory/OOM Issues",
            Self::CrashLoopBackOff => "Pod CrashLoopBackOff",
            Self::ImagePull => "Image Pull Errors",
            Self::Scheduling => "Pod Scheduling Issues",
            Self::NetworkDns => "Network/DNS Issues",
            Self::ArgoCdSync => "ArgoCD Sync Issues",
            Self::TektonPipeline => "Tekton Pipeline Issues",
            Self::Crossplane => "Crossplane Issues",
            Self::StoragePvc => "Storage/PVC Issues",
            Self::RbacPermission => "RBAC/Permission Issues",
            Self::Configuration => "Configuration Issues",
        }
    }
}

impl std::fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
