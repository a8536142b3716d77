//! Prometheus query targets.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Result format requested from the datasource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    TimeSeries,
    Table,
    Heatmap,
}

/// A Prometheus query attached to a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusTarget {
    /// Panel-unique reference id. Empty until the owning panel assigns one.
    pub ref_id: String,
    /// PromQL expression.
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub instant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TargetFormat>,
}

impl PrometheusTarget {
    /// Build a target from an expression and options.
    ///
    /// Fails when the expression is blank.
    pub fn new(expr: impl Into<String>, options: TargetOptions) -> CoreResult<Self> {
        let expr = expr.into();
        if expr.trim().is_empty() {
            return Err(CoreError::EmptyExpression);
        }

        Ok(Self {
            ref_id: options.ref_id.unwrap_or_default(),
            expr,
            legend_format: options.legend_format,
            hide: options.hide.unwrap_or(false),
            instant: options.instant.unwrap_or(false),
            interval: options.interval,
            format: options.format,
        })
    }
}

/// Options applied when a target is created.
///
/// Every field is optional; unset fields fall back to the datasource defaults.
/// Use [`TargetOptions::overlay`] to combine option sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetOptions {
    pub ref_id: Option<String>,
    pub hide: Option<bool>,
    pub legend_format: Option<String>,
    pub instant: Option<bool>,
    pub interval: Option<String>,
    pub format: Option<TargetFormat>,
}

impl TargetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    /// Hide the target from the rendered panel (it is still queried).
    #[must_use]
    pub fn hide(self) -> Self {
        self.visible(false)
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.hide = Some(!visible);
        self
    }

    #[must_use]
    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend_format = Some(legend.into());
        self
    }

    #[must_use]
    pub fn instant(mut self) -> Self {
        self.instant = Some(true);
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: TargetFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Combine two option sets; fields set in `top` win.
    #[must_use]
    pub fn overlay(self, top: TargetOptions) -> Self {
        Self {
            ref_id: top.ref_id.or(self.ref_id),
            hide: top.hide.or(self.hide),
            legend_format: top.legend_format.or(self.legend_format),
            instant: top.instant.or(self.instant),
            interval: top.interval.or(self.interval),
            format: top.format.or(self.format),
        }
    }
}

/// Reference id for the `index`-th target of a panel: A..Z, AA..AZ, ...
pub fn auto_ref_id(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_expression_rejected() {
        let err = PrometheusTarget::new("  \n", TargetOptions::new()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyExpression));
    }

    #[test]
    fn test_options_applied() {
        let target = PrometheusTarget::new(
            "up",
            TargetOptions::new().ref_id("up").hide().legend("{{job}}"),
        )
        .unwrap();
        assert_eq!(target.ref_id, "up");
        assert!(target.hide);
        assert_eq!(target.legend_format.as_deref(), Some("{{job}}"));
        assert!(!target.instant);
    }

    #[test]
    fn test_overlay_top_wins() {
        let base = TargetOptions::new().ref_id("A").legend("base").visible(true);
        let merged = base.overlay(TargetOptions::new().ref_id("B").hide());
        assert_eq!(merged.ref_id.as_deref(), Some("B"));
        assert_eq!(merged.hide, Some(true));
        assert_eq!(merged.legend_format.as_deref(), Some("base"));
    }

    #[test]
    fn test_auto_ref_id() {
        assert_eq!(auto_ref_id(0), "A");
        assert_eq!(auto_ref_id(25), "Z");
        assert_eq!(auto_ref_id(26), "AA");
        assert_eq!(auto_ref_id(27), "AB");
    }

    #[test]
    fn test_serialization_skips_defaults() {
        let target = PrometheusTarget::new("up", TargetOptions::new().ref_id("A")).unwrap();
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"refId":"A","expr":"up"}"#);
    }
}
