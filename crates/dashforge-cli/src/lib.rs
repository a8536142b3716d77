//! Command-line runner for dashforge dashboards.
//!
//! `CliBuilder` wires a dashboard (or a function building one against a
//! `RecordingMap`) into a small command set: apply, destroy, plan, to-yaml,
//! rules and dev.

pub mod cli;
pub mod config;
pub mod dev;
pub mod error;
pub mod runner;

pub use cli::{
    env_var_name, Action, Cli, CliBuilder, CliFlag, Invocation, RulesTarget, Settings,
    DEFAULT_RULES_FILE, DEFAULT_SERVER, DEFAULT_YAML_FILE,
};
pub use config::{DevConfig, FileConfig, RulesConfig};
pub use error::{AppError, AppResult};
pub use runner::Runner;
