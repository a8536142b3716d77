//! Structured logging and Prometheus run metrics for dashforge.
//!
//! - `init_logging`: tracing subscriber on stderr (pretty or JSON)
//! - `Metrics`: counters for API calls and recorded rules, exportable in the
//!   Prometheus text format for the node-exporter textfile collector

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
