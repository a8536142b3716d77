//! Rule file document types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API version of the Prometheus operator rule resource.
pub const PROMETHEUS_RULE_API_VERSION: &str = "monitoring.coreos.com/v1";

/// Kind of the Prometheus operator rule resource.
pub const PROMETHEUS_RULE_KIND: &str = "PrometheusRule";

/// A named, precomputed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRule {
    #[serde(rename = "record")]
    pub name: String,
    pub expr: String,
}

/// Top-level rule file: `groups: [...]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleGroups {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    /// Evaluation interval; the server's global default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub rules: Vec<RecordingRule>,
}

/// Metadata of the Kubernetes rule resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// `PrometheusRule` custom resource wrapping a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusRuleResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMetadata,
    pub spec: RuleGroups,
}

impl PrometheusRuleResource {
    pub fn new(metadata: ResourceMetadata, spec: RuleGroups) -> Self {
        Self {
            api_version: PROMETHEUS_RULE_API_VERSION.to_string(),
            kind: PROMETHEUS_RULE_KIND.to_string(),
            metadata,
            spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_serializes_as_record() {
        let rule = RecordingRule {
            name: "job:up:sum".to_string(),
            expr: "sum by (job) (up)".to_string(),
        };
        let value = serde_yaml::to_value(&rule).unwrap();
        assert_eq!(value["record"], "job:up:sum");
        assert_eq!(value["expr"], "sum by (job) (up)");
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_resource_envelope() {
        let resource = PrometheusRuleResource::new(
            ResourceMetadata::new("dash-rules", "monitoring")
                .label("release", "kube-prometheus")
                .label("app", "dash"),
            RuleGroups::default(),
        );
        let yaml = serde_yaml::to_string(&resource).unwrap();

        assert!(yaml.starts_with("apiVersion: monitoring.coreos.com/v1\nkind: PrometheusRule\n"));
        // labels are emitted in key order
        let app = yaml.find("app: dash").unwrap();
        let release = yaml.find("release: kube-prometheus").unwrap();
        assert!(app < release);
    }
}
