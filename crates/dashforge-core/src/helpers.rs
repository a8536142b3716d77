//! Small builder helpers: field overrides, variable defaults and quoting.

use crate::error::{CoreError, CoreResult};
use crate::field::{FieldMatcher, OverrideProperty};
use crate::panel::{Panel, PanelKind};
use crate::variable::{CurrentValue, Variable, VariableKind};
use serde_json::json;
use std::fmt;

/// Continuous color schemes understood by the color override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    RedYellowGreen,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RedYellowGreen => "Red-Yellow-Green",
        }
    }
}

/// Color override property using a continuous palette.
pub fn continuous_color_scheme(scheme: ColorScheme) -> OverrideProperty {
    OverrideProperty::new(
        "color",
        json!({
            "mode": "continuous-RdYlGr",
            "fixedColor": scheme.as_str(),
        }),
    )
}

/// Append a field override to a stat panel.
///
/// Errors when `panel` is not a stat panel.
pub fn stat_field_override(
    panel: &mut Panel,
    matcher: FieldMatcher,
    properties: Vec<OverrideProperty>,
) -> CoreResult<()> {
    if panel.kind() != PanelKind::Stat {
        return Err(CoreError::WrongPanelKind {
            expected: PanelKind::Stat.as_str(),
            actual: panel.kind().as_str(),
        });
    }
    panel.field_override(matcher, properties);
    Ok(())
}

/// Preselect `text` as the current value of a text variable.
pub fn variable_as_text_default(variable: &mut Variable, text: impl Into<String>) -> CoreResult<()> {
    if variable.kind != VariableKind::Textbox {
        return Err(CoreError::WrongVariableKind {
            expected: VariableKind::Textbox.as_str(),
            actual: variable.kind.as_str(),
        });
    }

    let text = text.into();
    variable.query = Some(text.clone());
    variable.current = Some(CurrentValue {
        text: vec![text.clone()],
        value: text,
    });
    Ok(())
}

/// Fixed string baked into queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DashboardConstant(pub String);

impl DashboardConstant {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_var_quote(&self) -> String {
        as_quoted(&self.0)
    }
}

impl fmt::Display for DashboardConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a dashboard template variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DashboardVariable(pub String);

impl DashboardVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Interpolation form: `$name`.
    pub fn as_var(&self) -> String {
        format!("${}", self.0)
    }

    /// Quoted interpolation form: `"$name"`.
    pub fn as_var_quote(&self) -> String {
        as_quoted(self.as_var())
    }
}

impl fmt::Display for DashboardVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pixel(pub u32);

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Wrap a value in double quotes.
pub fn as_quoted<T: fmt::Display>(value: T) -> String {
    format!("\"{value}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuous_color_scheme() {
        let prop = continuous_color_scheme(ColorScheme::RedYellowGreen);
        assert_eq!(prop.id, "color");
        assert_eq!(prop.value["mode"], "continuous-RdYlGr");
        assert_eq!(prop.value["fixedColor"], "Red-Yellow-Green");
    }

    #[test]
    fn test_stat_field_override() {
        let mut panel = Panel::stat("Availability");
        stat_field_override(
            &mut panel,
            FieldMatcher::by_name("availability"),
            vec![continuous_color_scheme(ColorScheme::RedYellowGreen)],
        )
        .unwrap();

        let overrides = &panel.field_config().overrides;
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].matcher, FieldMatcher::by_name("availability"));
        assert_eq!(overrides[0].properties[0].id, "color");
    }

    #[test]
    fn test_stat_field_override_rejects_other_kinds() {
        let mut panel = Panel::time_series("Latency");
        let err = stat_field_override(&mut panel, FieldMatcher::by_name("x"), vec![]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::WrongPanelKind {
                expected: "stat",
                actual: "timeseries"
            }
        ));
        assert!(panel.field_config().overrides.is_empty());
    }

    #[test]
    fn test_variable_as_text_default() {
        let mut var = Variable::textbox("namespace");
        variable_as_text_default(&mut var, "monitoring").unwrap();

        let current = var.current.as_ref().unwrap();
        assert_eq!(current.text, vec!["monitoring".to_string()]);
        assert_eq!(current.value, "monitoring");
    }

    #[test]
    fn test_variable_default_rejects_other_kinds() {
        let mut var = Variable::query("job", "label_values(up, job)");
        assert!(variable_as_text_default(&mut var, "x").is_err());
        assert!(var.current.is_none());
    }

    #[test]
    fn test_quoting_helpers() {
        let constant = DashboardConstant::new("kube-system");
        assert_eq!(constant.to_string(), "kube-system");
        assert_eq!(constant.as_var_quote(), "\"kube-system\"");

        let var = DashboardVariable::new("cluster");
        assert_eq!(var.as_var(), "$cluster");
        assert_eq!(var.as_var_quote(), "\"$cluster\"");
        assert_eq!(var.to_string(), "cluster");

        assert_eq!(Pixel(200).to_string(), "200px");
        assert_eq!(as_quoted(42), "\"42\"");
    }
}
