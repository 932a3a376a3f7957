use crate::types::{ProblemCategory, SessionRecord};

/// Keyword predicate over lower-cased incident text.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Any(&'static [&'static str]),
    /// `all` must match and at least one of `any`.
    AllThenAny {
        all: &'static str,
        any: &'static [&'static str],
    },
}

impl Matcher {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Any(keywords) => keywords.iter().any(|kw| text.contains(*kw)),
            Self::AllThenAny { all, any } => {
                text.contains(*all) && any.iter().any(|kw| text.contains(*kw))
            }
        }
    }
}

/// Evaluated top to bottom; the first match decides the category.
pub const RULES: &[(Matcher, ProblemCategory)] = &[
    (
        Matcher::Any(&["oom", "out of memory", "memory limit"]),
        ProblemCategory::MemoryOom,
    ),
    (
        Matcher::Any(&["crashloop", "crash"]),
        ProblemCategory::CrashLoopBackOff,
    ),
    (
        Matcher::AllThenAny {
            all: "image",
            any: &["pull", "not found"],
        },
        ProblemCategory::ImagePull,
    ),
    (
        Matcher::Any(&["pending", "scheduling"]),
        ProblemCategory::Scheduling,
    ),
    (
        Matcher::Any(&["network", "dns", "connection"]),
        ProblemCategory::NetworkDns,
    ),
    (Matcher::Any(&["argocd", "sync"]), ProblemCategory::ArgoCdSync),
    (
        Matcher::Any(&["tekton", "pipeline"]),
        ProblemCategory::TektonPipeline,
    ),
    (Matcher::Any(&["crossplane"]), ProblemCategory::Crossplane),
    (
        Matcher::Any(&["storage", "pvc", "volume"]),
        ProblemCategory::StoragePvc,
    ),
    (
        Matcher::Any(&["permission", "rbac", "forbidden"]),
        ProblemCategory::RbacPermission,
    ),
];

pub const DEFAULT_CATEGORY: ProblemCategory = ProblemCategory::Configuration;

pub fn classify(record: &SessionRecord) -> ProblemCategory {
    classify_text(
        record.problem_description.as_deref().unwrap_or(""),
        record.root_cause.as_deref().unwrap_or(""),
    )
}

pub fn classify_text(problem_description: &str, root_cause: &str) -> ProblemCategory {
    let text = format!("{problem_description} {root_cause}").to_lowercase();
    RULES
        .iter()
        .find(|(matcher, _)| matcher.matches(&text))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::{classify, classify_text};
    use crate::types::{ProblemCategory, SessionRecord};

    #[test]
    fn each_rule_maps_to_its_category() {
        let cases = [
            ("Container was OOMKilled", ProblemCategory::MemoryOom),
            ("pod hit memory limit", ProblemCategory::MemoryOom),
            ("CrashLoopBackOff after deploy", ProblemCategory::CrashLoopBackOff),
            ("ErrImagePull from registry", ProblemCategory::ImagePull),
            ("image tag not found", ProblemCategory::ImagePull),
            ("pod stuck Pending", ProblemCategory::Scheduling),
            ("DNS lookups timing out", ProblemCategory::NetworkDns),
            ("ArgoCD app OutOfSync", ProblemCategory::ArgoCdSync),
            ("Tekton task failed", ProblemCategory::TektonPipeline),
            ("Crossplane claim not ready", ProblemCategory::Crossplane),
            ("PVC could not bind", ProblemCategory::StoragePvc),
            ("serviceaccount forbidden", ProblemCategory::RbacPermission),
            ("wrong env var in configmap", ProblemCategory::Configuration),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_text(text, ""), expected, "text: {text}");
        }
    }

    #[test]
    fn earlier_rule_wins_when_several_match() {
        assert_eq!(
            classify_text("oom then crashloop", ""),
            ProblemCategory::MemoryOom
        );
        assert_eq!(
            classify_text("pipeline pod pending", ""),
            ProblemCategory::Scheduling
        );
    }

    #[test]
    fn image_without_pull_or_not_found_falls_through() {
        assert_eq!(
            classify_text("image was outdated", ""),
            ProblemCategory::Configuration
        );
    }

    #[test]
    fn root_cause_text_participates_in_matching() {
        assert_eq!(
            classify_text("service unreachable", "RBAC role missing"),
            ProblemCategory::RbacPermission
        );
    }

    #[test]
    fn empty_record_lands_in_default_category() {
        assert_eq!(
            classify(&SessionRecord::default()),
            ProblemCategory::Configuration
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let record = SessionRecord {
            problem_description: Some("Volume mount failed".to_string()),
            root_cause: Some("Storage class missing".to_string()),
            ..SessionRecord::default()
        };
        let first = classify(&record);
        for _ in 0..5 {
            assert_eq!(classify(&record), first);
        }
        assert_eq!(first, ProblemCategory::StoragePvc);
    }
}
