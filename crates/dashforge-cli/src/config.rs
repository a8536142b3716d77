//! Optional TOML configuration file.
//!
//! Every top-level value is optional: a value set here is used only when the
//! matching flag and environment variable are both absent.

use crate::error::{AppError, AppResult};
use dashforge_rules::RuleValidator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Grafana base URL.
    #[serde(default)]
    pub server: Option<String>,
    /// Folder the dashboard is stored in. Empty means General.
    #[serde(default)]
    pub folder: Option<String>,
    /// Target of `to-yaml`.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub debug_queries: Option<bool>,
    #[serde(default)]
    pub metrics_file: Option<String>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub dev: DevConfig,
}

impl FileConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}

/// `[rules]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule group name; the builder's group is used when unset.
    #[serde(default)]
    pub group: Option<String>,
    /// Target of `rules`.
    #[serde(default)]
    pub file: Option<String>,
    /// Namespace of the PrometheusRule resource.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Labels added to every PrometheusRule resource.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Checker command for `rules --check`; the rule file path is appended.
    #[serde(default = "default_validator")]
    pub validator: Vec<String>,
}

fn default_namespace() -> String {
    "monitoring".to_string()
}

fn default_validator() -> Vec<String> {
    vec![
        "promtool".to_string(),
        "check".to_string(),
        "rules".to_string(),
    ]
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            group: None,
            file: None,
            namespace: default_namespace(),
            labels: BTreeMap::new(),
            validator: default_validator(),
        }
    }
}

impl RulesConfig {
    pub fn rule_validator(&self) -> AppResult<RuleValidator> {
        match self.validator.split_first() {
            Some((program, args)) => Ok(RuleValidator::new(program.clone(), args.iter().cloned())),
            None => Err(AppError::Config("rules.validator must not be empty".to_string())),
        }
    }
}

/// `[dev]` section: the local Grafana and Prometheus containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_grafana_image")]
    pub grafana_image: String,
    #[serde(default = "default_prometheus_image")]
    pub prometheus_image: String,
    /// Host port for Grafana. Default: 3000.
    #[serde(default = "default_grafana_port")]
    pub grafana_port: u16,
    /// Host port for Prometheus. Default: 9090.
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
    /// Health polls before giving up. Default: 60.
    #[serde(default = "default_health_attempts")]
    pub health_attempts: u32,
    /// Delay between health polls (ms). Default: 1000.
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
}

fn default_grafana_image() -> String {
    "grafana/grafana:11.1.0".to_string()
}

fn default_prometheus_image() -> String {
    "prom/prometheus:v2.53.0".to_string()
}

fn default_grafana_port() -> u16 {
    3000
}

fn default_prometheus_port() -> u16 {
    9090
}

fn default_health_attempts() -> u32 {
    60
}

fn default_health_interval_ms() -> u64 {
    1_000
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            grafana_image: default_grafana_image(),
            prometheus_image: default_prometheus_image(),
            grafana_port: default_grafana_port(),
            prometheus_port: default_prometheus_port(),
            health_attempts: default_health_attempts(),
            health_interval_ms: default_health_interval_ms(),
        }
    }
}
