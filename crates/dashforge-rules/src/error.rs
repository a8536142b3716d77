//! Rule output error types.

use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to run rule validator '{program}': {source}")]
    ValidatorSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule validator '{program}' failed: {status}")]
    ValidatorFailed { program: String, status: ExitStatus },
}

pub type RulesResult<T> = Result<T, RulesError>;
