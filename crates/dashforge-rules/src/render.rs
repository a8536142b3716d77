//! Panel targets backed by recorded rules.
//!
//! Every recorded query is attached to a panel twice: once through the rule
//! name and once as the raw expression. Only one of the two is visible,
//! depending on the map's debug flag.

use crate::map::RecordingMap;
use dashforge_core::{CoreError, CoreResult, Panel, PrometheusTarget, TargetOptions};

/// Ref id of the raw-expression target paired with `name`.
pub fn direct_ref_id(name: &str) -> String {
    format!("{name}_direct")
}

/// The two targets rendered for one recorded query.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPair {
    /// Queries the recorded rule name; ref id `<name>`.
    pub recorded: PrometheusTarget,
    /// Queries the expression as written; ref id `<name>_direct`.
    pub direct: PrometheusTarget,
}

impl RecordingMap {
    /// Record `expr` as `name` and build the target pair for it.
    ///
    /// The ref id and visibility set here take precedence over `options`.
    pub fn target_pair(
        &mut self,
        name: &str,
        expr: &str,
        options: TargetOptions,
    ) -> CoreResult<TargetPair> {
        if name.trim().is_empty() {
            return Err(CoreError::EmptyRuleName);
        }
        if expr.trim().is_empty() {
            return Err(CoreError::EmptyExpression);
        }

        let digest = self.register(name, expr);
        let recorded_name = self.resolve(&digest).to_string();
        let debug = self.is_debug();

        let recorded = PrometheusTarget::new(
            recorded_name,
            options
                .clone()
                .overlay(TargetOptions::new().ref_id(name).visible(!debug)),
        )?;
        let direct = PrometheusTarget::new(
            expr,
            options.overlay(TargetOptions::new().ref_id(direct_ref_id(name)).visible(debug)),
        )?;

        Ok(TargetPair { recorded, direct })
    }

    /// Record `expr` as `name` and append both targets to `panel`.
    ///
    /// Nothing is recorded or appended when the panel cannot take the pair.
    pub fn add_targets(
        &mut self,
        panel: &mut Panel,
        name: &str,
        expr: &str,
        options: TargetOptions,
    ) -> CoreResult<()> {
        if !panel.kind().accepts_targets() {
            return Err(CoreError::WrongPanelKind {
                expected: "query",
                actual: panel.kind().as_str(),
            });
        }
        let direct = direct_ref_id(name);
        if let Some(taken) = panel
            .targets()
            .iter()
            .find(|t| t.ref_id == name || t.ref_id == direct)
        {
            return Err(CoreError::DuplicateRefId {
                panel: panel.title().to_string(),
                ref_id: taken.ref_id.clone(),
            });
        }

        let pair = self.target_pair(name, expr, options)?;
        panel.add_prometheus_target(pair.recorded)?;
        panel.add_prometheus_target(pair.direct)
    }

    /// Chainable form of [`RecordingMap::add_targets`].
    pub fn with_targets(
        &mut self,
        mut panel: Panel,
        name: &str,
        expr: &str,
        options: TargetOptions,
    ) -> CoreResult<Panel> {
        self.add_targets(&mut panel, name, expr, options)?;
        Ok(panel)
    }
}
