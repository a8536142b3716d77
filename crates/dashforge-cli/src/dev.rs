//! Local Grafana and Prometheus stack run through `testcontainers`.
//!
//! Prometheus is started with the recorded rules loaded, Grafana with an
//! anonymous admin and a provisioned Prometheus datasource. The dashboard is
//! applied once Grafana reports healthy. Containers are removed on Ctrl-C or
//! on failure; a stack dropped mid-start is cleaned up by `testcontainers`.

use crate::config::DevConfig;
use crate::error::{AppError, AppResult};
use crate::runner::{publish, Runner};
use dashforge_client::GrafanaClient;
use dashforge_core::dashboard::slugify;
use dashforge_rules::RecordingMap;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::{debug, info, warn};

/// Datasource uid provisioned in Grafana.
pub const DATASOURCE_UID: &str = "prometheus";

const RULES_FILE: &str = "rules.yml";
const PROMETHEUS_CONFIG_FILE: &str = "prometheus.yml";
const DATASOURCE_FILE: &str = "dashforge.yml";

pub struct DevStack {
    config: DevConfig,
    workdir: TempDir,
    prefix: String,
}

impl DevStack {
    pub fn new(app_name: &str, config: DevConfig) -> AppResult<Self> {
        let workdir = tempfile::Builder::new().prefix("dashforge-dev-").tempdir()?;
        let mut prefix = slugify(app_name);
        if prefix.is_empty() {
            prefix = "dashforge".to_string();
        }
        Ok(Self {
            config,
            workdir,
            prefix,
        })
    }

    pub fn grafana_url(&self) -> String {
        format!("http://localhost:{}", self.config.grafana_port)
    }

    pub fn prometheus_url(&self) -> String {
        format!("http://localhost:{}", self.config.prometheus_port)
    }

    fn network(&self) -> String {
        format!("{}-dev", self.prefix)
    }

    fn grafana_container(&self) -> String {
        format!("{}-grafana", self.prefix)
    }

    fn prometheus_container(&self) -> String {
        format!("{}-prometheus", self.prefix)
    }

    fn prometheus_dir(&self) -> PathBuf {
        self.workdir.path().join("prometheus")
    }

    fn datasource_dir(&self) -> PathBuf {
        self.workdir.path().join("datasources")
    }

    /// Write the rule file, Prometheus config and datasource provisioning.
    pub fn prepare(&self, rules: &RecordingMap, group: &str) -> AppResult<()> {
        let prometheus_dir = self.prometheus_dir();
        let datasource_dir = self.datasource_dir();
        std::fs::create_dir_all(&prometheus_dir)?;
        std::fs::create_dir_all(&datasource_dir)?;

        rules.write_rules_yaml(group, &prometheus_dir.join(RULES_FILE), None)?;
        write_yaml(
            &prometheus_dir.join(PROMETHEUS_CONFIG_FILE),
            &prometheus_config(),
        )?;
        write_yaml(
            &datasource_dir.join(DATASOURCE_FILE),
            &datasource_config(&self.prometheus_container()),
        )?;

        debug!(workdir = %self.workdir.path().display(), "Dev stack files written");
        Ok(())
    }

    pub fn prometheus_request(&self) -> ContainerRequest<GenericImage> {
        let (name, tag) = split_image(&self.config.prometheus_image);
        GenericImage::new(name, tag)
            .with_container_name(self.prometheus_container())
            .with_network(self.network())
            .with_mapped_port(self.config.prometheus_port, 9090.tcp())
            .with_mount(Mount::bind_mount(
                self.prometheus_dir().display().to_string(),
                "/etc/prometheus",
            ))
            .with_cmd([format!(
                "--config.file=/etc/prometheus/{PROMETHEUS_CONFIG_FILE}"
            )])
    }

    pub fn grafana_request(&self) -> ContainerRequest<GenericImage> {
        let (name, tag) = split_image(&self.config.grafana_image);
        GenericImage::new(name, tag)
            .with_container_name(self.grafana_container())
            .with_network(self.network())
            .with_mapped_port(self.config.grafana_port, 3000.tcp())
            .with_env_var("GF_AUTH_ANONYMOUS_ENABLED", "true")
            .with_env_var("GF_AUTH_ANONYMOUS_ORG_ROLE", "Admin")
            .with_env_var("GF_AUTH_DISABLE_LOGIN_FORM", "true")
            .with_mount(Mount::bind_mount(
                self.datasource_dir().display().to_string(),
                "/etc/grafana/provisioning/datasources",
            ))
    }

    async fn start(&self) -> AppResult<RunningStack> {
        info!(network = %self.network(), "Starting dev stack");
        let prometheus = self
            .prometheus_request()
            .start()
            .await
            .map_err(|e| AppError::Dev(format!("Failed to start Prometheus: {e}")))?;
        debug!(container = %prometheus.id(), "Prometheus started");
        let grafana = self
            .grafana_request()
            .start()
            .await
            .map_err(|e| AppError::Dev(format!("Failed to start Grafana: {e}")))?;
        debug!(container = %grafana.id(), "Grafana started");
        Ok(RunningStack {
            prometheus,
            grafana,
        })
    }

    /// Start containers, wait for Grafana and publish the dashboard.
    async fn up(&self, runner: &Runner) -> AppResult<(RunningStack, String)> {
        let running = self.start().await?;
        match self.publish_when_healthy(runner).await {
            Ok(link) => Ok((running, link)),
            Err(e) => {
                running.remove().await;
                Err(e)
            }
        }
    }

    async fn publish_when_healthy(&self, runner: &Runner) -> AppResult<String> {
        let client = GrafanaClient::new(self.grafana_url(), None)?;
        wait_for_health(
            &client,
            self.config.health_attempts,
            Duration::from_millis(self.config.health_interval_ms),
        )
        .await?;
        publish(&client, &runner.settings().folder, runner.dashboard()).await
    }
}

struct RunningStack {
    prometheus: ContainerAsync<GenericImage>,
    grafana: ContainerAsync<GenericImage>,
}

impl RunningStack {
    /// Remove both containers. Failures are logged, not returned.
    async fn remove(self) {
        info!("Removing dev stack");
        for (name, container) in [("grafana", self.grafana), ("prometheus", self.prometheus)] {
            if let Err(e) = container.rm().await {
                warn!(container = name, error = %e, "Dev stack cleanup failed");
            }
        }
    }
}

/// Run the dev stack until Ctrl-C.
pub async fn run(runner: &Runner) -> AppResult<()> {
    let settings = runner.settings();
    let stack = DevStack::new(&settings.app_name, settings.config.dev.clone())?;
    stack.prepare(runner.rules(), &settings.rule_group)?;

    tokio::select! {
        up = stack.up(runner) => {
            let (running, link) = up?;
            println!("Dashboard available at:\n{link}");
            println!("Prometheus: {}", stack.prometheus_url());
            println!("Press Ctrl-C to stop");
            let signal = tokio::signal::ctrl_c().await.map_err(AppError::from);
            running.remove().await;
            signal
        }
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupted before the stack was ready");
            signal.map_err(AppError::from)
        }
    }
}

/// Poll `GET /api/health` until the database reports ok.
pub async fn wait_for_health(
    client: &GrafanaClient,
    attempts: u32,
    interval: Duration,
) -> AppResult<()> {
    for attempt in 1..=attempts {
        match client.health().await {
            Ok(health) if health.database == "ok" => {
                info!(version = %health.version, attempt, "Grafana is healthy");
                return Ok(());
            }
            Ok(health) => debug!(attempt, database = %health.database, "Grafana not ready"),
            Err(e) => debug!(attempt, error = %e, "Grafana not reachable yet"),
        }
        tokio::time::sleep(interval).await;
    }
    Err(AppError::Dev(format!(
        "Grafana at {} not healthy after {attempts} attempts",
        client.base_url()
    )))
}

fn prometheus_config() -> serde_json::Value {
    json!({
        "global": {
            "scrape_interval": "15s",
            "evaluation_interval": "15s",
        },
        "rule_files": [format!("/etc/prometheus/{RULES_FILE}")],
        "scrape_configs": [{
            "job_name": "prometheus",
            "static_configs": [{"targets": ["localhost:9090"]}],
        }],
    })
}

fn datasource_config(prometheus_host: &str) -> serde_json::Value {
    json!({
        "apiVersion": 1,
        "datasources": [{
            "name": "Prometheus",
            "type": "prometheus",
            "uid": DATASOURCE_UID,
            "access": "proxy",
            "url": format!("http://{prometheus_host}:9090"),
            "isDefault": true,
        }],
    })
}

fn write_yaml(path: &Path, value: &serde_json::Value) -> AppResult<()> {
    std::fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

/// Split `name[:tag]`; a colon inside a registry host is not a tag.
fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}
