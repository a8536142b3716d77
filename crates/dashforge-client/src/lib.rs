//! Grafana HTTP API client for dashforge.
//!
//! Covers the calls needed to publish a dashboard: health check, folder
//! lookup or creation, dashboard upsert and deletion.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GrafanaClient, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult};
pub use types::{DashboardRef, Folder, HealthStatus};
