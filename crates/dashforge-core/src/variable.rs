//! Dashboard template variables.

use crate::panel::DatasourceRef;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Textbox,
    Query,
    Custom,
    Constant,
    Interval,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Textbox => "textbox",
            Self::Query => "query",
            Self::Custom => "custom",
            Self::Constant => "constant",
            Self::Interval => "interval",
        }
    }
}

/// Preselected value of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentValue {
    pub text: Vec<String>,
    pub value: String,
}

/// Selectable option of a custom/interval variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableOption {
    pub text: String,
    pub value: String,
    pub selected: bool,
}

/// A template variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<VariableOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentValue>,
    /// 0 = visible, 1 = label hidden, 2 = hidden.
    pub hide: u8,
    pub multi: bool,
    pub include_all: bool,
}

impl Variable {
    fn new(kind: VariableKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            label: None,
            query: None,
            datasource: None,
            options: Vec::new(),
            current: None,
            hide: 0,
            multi: false,
            include_all: false,
        }
    }

    /// Free-text input.
    pub fn textbox(name: impl Into<String>) -> Self {
        Self::new(VariableKind::Textbox, name)
    }

    /// Values from a datasource query, e.g. `label_values(up, job)`.
    pub fn query(name: impl Into<String>, query: impl Into<String>) -> Self {
        let mut var = Self::new(VariableKind::Query, name);
        var.query = Some(query.into());
        var
    }

    /// Fixed list of values; the first one is preselected.
    pub fn custom<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        let mut var = Self::new(VariableKind::Custom, name);
        var.set_options(values);
        var
    }

    /// Interval choices such as `1m`, `5m`; the first one is preselected.
    pub fn interval<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        let mut var = Self::new(VariableKind::Interval, name);
        var.set_options(values);
        var
    }

    /// Hidden constant.
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut var = Self::new(VariableKind::Constant, name);
        var.hide = 2;
        var.query = Some(value.clone());
        var.current = Some(CurrentValue {
            text: vec![value.clone()],
            value,
        });
        var
    }

    fn set_options<S: AsRef<str>>(&mut self, values: &[S]) {
        self.query = Some(
            values
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(","),
        );
        self.options = values
            .iter()
            .enumerate()
            .map(|(i, v)| VariableOption {
                text: v.as_ref().to_string(),
                value: v.as_ref().to_string(),
                selected: i == 0,
            })
            .collect();
        self.current = values.first().map(|v| CurrentValue {
            text: vec![v.as_ref().to_string()],
            value: v.as_ref().to_string(),
        });
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn datasource(mut self, uid: impl Into<String>) -> Self {
        self.datasource = Some(DatasourceRef::prometheus(uid));
        self
    }

    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    #[must_use]
    pub fn include_all(mut self) -> Self {
        self.include_all = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hide = 2;
        self
    }
}
