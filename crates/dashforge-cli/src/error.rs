//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dashboard error: {0}")]
    Core(#[from] dashforge_core::CoreError),

    #[error("Recording rules error: {0}")]
    Rules(#[from] dashforge_rules::RulesError),

    #[error("Grafana client error: {0}")]
    Client(#[from] dashforge_client::ClientError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dashforge_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dev stack error: {0}")]
    Dev(String),

    #[error(transparent)]
    Cli(#[from] clap::Error),
}

pub type AppResult<T> = Result<T, AppError>;
