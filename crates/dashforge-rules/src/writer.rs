//! Rule file output and external validation.

use crate::document::{PrometheusRuleResource, ResourceMetadata};
use crate::error::{RulesError, RulesResult};
use crate::map::RecordingMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// External rule checker, run as `<program> <args...> <rule file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleValidator {
    program: String,
    args: Vec<String>,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::promtool()
    }
}

impl RuleValidator {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `promtool check rules <file>`.
    pub fn promtool() -> Self {
        Self::new("promtool", ["check", "rules"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the checker against `path`, inheriting stdio.
    ///
    /// A non-zero exit is returned as [`RulesError::ValidatorFailed`].
    pub fn check(&self, path: &Path) -> RulesResult<()> {
        info!(program = %self.program, path = %path.display(), "Validating rule file");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| RulesError::ValidatorSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            warn!(program = %self.program, %status, "Rule validation failed");
            return Err(RulesError::ValidatorFailed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}

impl RecordingMap {
    /// Write the plain rule file for `group_name` to `path`, then run
    /// `validator` on it when given.
    pub fn write_rules_yaml(
        &self,
        group_name: &str,
        path: &Path,
        validator: Option<&RuleValidator>,
    ) -> RulesResult<()> {
        let groups = self.to_rule_group(group_name);
        write_yaml(path, &groups, "Error creating PrometheusRule file")?;
        info!(
            path = %path.display(),
            group = %group_name,
            rules = self.len(),
            "Wrote recording rules"
        );

        match validator {
            Some(validator) => validator.check(path),
            None => Ok(()),
        }
    }

    /// Write the rules wrapped in a `PrometheusRule` resource to `path`.
    pub fn write_k8s_rules_yaml(
        &self,
        group_name: &str,
        path: &Path,
        metadata: ResourceMetadata,
    ) -> RulesResult<()> {
        let resource = PrometheusRuleResource::new(metadata, self.to_rule_group(group_name));
        write_yaml(path, &resource, "Error creating K8s PrometheusRule file")?;
        info!(
            path = %path.display(),
            name = %resource.metadata.name,
            namespace = %resource.metadata.namespace,
            rules = self.len(),
            "Wrote PrometheusRule resource"
        );
        Ok(())
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T, context: &str) -> RulesResult<()> {
    let io_err = |source| RulesError::Io {
        context: format!("{context} {}", path.display()),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_yaml::to_writer(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
