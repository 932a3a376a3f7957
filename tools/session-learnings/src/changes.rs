use crate::errors::LearningsError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

pub const CHANGE_MANIFEST_PREFIX: &str = "k8s-changes-";
pub const CHANGE_MANIFEST_SUFFIX: &str = ".yaml";

/// What a captured manifest most likely did to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    RestartPolicyFix,
    ScalingAdjustment,
    ResourceLimitFix,
    ConfigurationUpdate,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RestartPolicyFix => "restart_policy_fix",
            Self::ScalingAdjustment => "scaling_adjustment",
            Self::ResourceLimitFix => "resource_limit_fix",
            Self::ConfigurationUpdate => "configuration_update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedResource {
    pub kind: String,
    pub name: Option<String>,
    pub action: ChangeAction,
}

impl ChangedResource {
    /// `deployment/payments-api (resource_limit_fix)`, in the same shape as a
    /// learning report's Resources Modified bullets.
    pub fn label(&self) -> String {
        let kind = self.kind.to_lowercase();
        match &self.name {
            Some(name) => format!("{kind}/{name} ({})", self.action.as_str()),
            None => format!("{kind} ({})", self.action.as_str()),
        }
    }
}

pub fn change_manifest_name(token: &str) -> String {
    format!("{CHANGE_MANIFEST_PREFIX}{token}{CHANGE_MANIFEST_SUFFIX}")
}

/// Every `kind`-bearing document of a multi-document YAML stream, in order.
/// Empty and non-mapping documents are skipped.
pub fn parse_change_manifest(text: &str) -> Result<Vec<ChangedResource>, LearningsError> {
    let mut resources = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value =
            Value::deserialize(document).map_err(|e| LearningsError::ManifestParse(e.to_string()))?;
        let Some(kind) = value.get("kind").and_then(Value::as_str) else {
            continue;
        };
        let name = value
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        resources.push(ChangedResource {
            kind: kind.to_string(),
            name,
            action: infer_action(kind, &value),
        });
    }
    Ok(resources)
}

pub fn infer_action(kind: &str, manifest: &Value) -> ChangeAction {
    match kind {
        "Pod" if has_key(manifest, "restartPolicy") => ChangeAction::RestartPolicyFix,
        "Deployment" if has_key(manifest, "replicas") => ChangeAction::ScalingAdjustment,
        "Deployment" if has_key(manifest, "resources") => ChangeAction::ResourceLimitFix,
        _ => ChangeAction::ConfigurationUpdate,
    }
}

fn has_key(value: &Value, key: &str) -> bool {
    match value {
        Value::Mapping(map) => map
            .iter()
            .any(|(k, v)| k.as_str() == Some(key) || has_key(v, key)),
        Value::Sequence(items) => items.iter().any(|item| has_key(item, key)),
        Value::Tagged(tagged) => has_key(&tagged.value, key),
        _ => false,
    }
}
