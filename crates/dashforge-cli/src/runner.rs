//! Command implementations.

use crate::cli::{Action, RulesTarget, Settings};
use crate::dev;
use crate::error::AppResult;
use dashforge_client::GrafanaClient;
use dashforge_core::Dashboard;
use dashforge_rules::RecordingMap;
use dashforge_telemetry::Metrics;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// A built dashboard with its recording rules and resolved settings.
pub struct Runner {
    settings: Settings,
    dashboard: Dashboard,
    rules: RecordingMap,
}

impl Runner {
    pub fn new(settings: Settings, dashboard: Dashboard, rules: RecordingMap) -> Self {
        Metrics::rules_recorded(rules.len(), rules.alias_count());
        Metrics::dashboard_built(dashboard.panel_count());
        Self {
            settings,
            dashboard,
            rules,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn rules(&self) -> &RecordingMap {
        &self.rules
    }

    pub async fn execute(&self, action: &Action) -> AppResult<()> {
        info!(command = action.name(), dashboard = %self.dashboard.uid_str(), "Running command");
        match action {
            Action::Apply => {
                let link = self.apply().await?;
                println!("The deed is done:\n{link}");
                Ok(())
            }
            Action::Destroy => self.destroy().await,
            Action::Plan => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                self.plan(&mut out)
            }
            Action::ToYaml { file } => self.to_yaml(file),
            Action::Rules(target) => self.write_rules(target),
            Action::Dev => dev::run(self).await,
        }
    }

    fn client(&self) -> AppResult<GrafanaClient> {
        Ok(GrafanaClient::new(
            self.settings.server.clone(),
            self.settings.api_key.clone(),
        )?)
    }

    /// Upload the dashboard and return its absolute link.
    pub async fn apply(&self) -> AppResult<String> {
        let client = self.client()?;
        publish(&client, &self.settings.folder, &self.dashboard).await
    }

    pub async fn destroy(&self) -> AppResult<()> {
        let client = self.client()?;
        client.delete_dashboard(self.dashboard.uid_str()).await?;
        info!(uid = %self.dashboard.uid_str(), "Dashboard deleted");
        Ok(())
    }

    /// Pretty-printed dashboard JSON.
    pub fn plan<W: Write>(&self, out: &mut W) -> AppResult<()> {
        writeln!(out, "{}", self.dashboard.to_json_pretty()?)?;
        Ok(())
    }

    pub fn to_yaml(&self, path: &Path) -> AppResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_yaml::to_writer(&mut writer, &self.dashboard)?;
        writer.flush()?;
        info!(path = %path.display(), "Wrote dashboard YAML");
        Ok(())
    }

    pub fn write_rules(&self, target: &RulesTarget) -> AppResult<()> {
        if self.rules.is_empty() {
            warn!("No recording rules registered, writing an empty group");
        }
        let group = &self.settings.rule_group;

        match &target.resource {
            Some(metadata) => {
                self.rules
                    .write_k8s_rules_yaml(group, &target.file, metadata.clone())?;
            }
            None => {
                let validator = if target.check {
                    Some(self.settings.config.rules.rule_validator()?)
                } else {
                    None
                };
                self.rules
                    .write_rules_yaml(group, &target.file, validator.as_ref())?;
            }
        }
        Ok(())
    }
}

/// Find or create `folder`, upsert `dashboard` into it and return the link.
pub(crate) async fn publish(
    client: &GrafanaClient,
    folder: &str,
    dashboard: &Dashboard,
) -> AppResult<String> {
    let folder = client.find_or_create_folder(folder).await?;
    let stored = client.upsert_dashboard(folder.as_ref(), dashboard).await?;
    Ok(client.dashboard_link(&stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use dashforge_core::{Panel, TargetOptions};
    use tempfile::TempDir;

    fn runner() -> Runner {
        let mut rules = RecordingMap::new(false);
        let panel = rules
            .with_targets(Panel::stat("Up"), "job:up:sum", "sum by (job) (up)", TargetOptions::new())
            .unwrap();
        let dashboard = Dashboard::new("Runner test").unwrap().panel(panel);
        let settings = Settings {
            app_name: "runner-test".to_string(),
            server: "http://localhost:3000".to_string(),
            api_key: None,
            folder: String::new(),
            debug_queries: false,
            metrics_file: None,
            rule_group: "runner".to_string(),
            config: FileConfig::default(),
        };
        Runner::new(settings, dashboard, rules)
    }

    #[test]
    fn test_plan_prints_json() {
        let mut out = Vec::new();
        runner().plan(&mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["title"], "Runner test");
        assert_eq!(value["panels"][0]["targets"][0]["expr"], "job:up:sum");
    }

    #[test]
    fn test_to_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.yml");
        runner().to_yaml(&path).unwrap();

        let value: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["uid"], "runner-test");
        assert_eq!(value["panels"][0]["type"], "stat");
    }

    #[test]
    fn test_write_rules_plain_and_k8s() {
        let dir = TempDir::new().unwrap();
        let runner = runner();

        let plain = dir.path().join("rules.yml");
        runner
            .write_rules(&RulesTarget {
                file: plain.clone(),
                check: false,
                resource: None,
            })
            .unwrap();
        let content = std::fs::read_to_string(&plain).unwrap();
        assert!(content.starts_with("groups:"));
        assert!(content.contains("name: runner"));

        let k8s = dir.path().join("k8s.yml");
        runner
            .write_rules(&RulesTarget {
                file: k8s.clone(),
                check: false,
                resource: Some(dashforge_rules::ResourceMetadata::new("r", "ns")),
            })
            .unwrap();
        let content = std::fs::read_to_string(&k8s).unwrap();
        assert!(content.contains("kind: PrometheusRule"));
    }
}
