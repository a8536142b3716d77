//! Panel field configuration and overrides.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Field configuration block of a panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub defaults: FieldDefaults,
    #[serde(default)]
    pub overrides: Vec<FieldOverride>,
}

/// Defaults applied to every field of a panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Selects the fields an override applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatcher {
    pub id: String,
    pub options: Value,
}

impl FieldMatcher {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: "byName".to_string(),
            options: Value::String(name.into()),
        }
    }

    pub fn by_regexp(pattern: impl Into<String>) -> Self {
        Self {
            id: "byRegexp".to_string(),
            options: Value::String(pattern.into()),
        }
    }

    /// Match by field type (`number`, `string`, `time`, ...).
    pub fn by_type(field_type: impl Into<String>) -> Self {
        Self {
            id: "byType".to_string(),
            options: Value::String(field_type.into()),
        }
    }

    /// Match every field produced by the query with the given ref id.
    pub fn by_query(ref_id: impl Into<String>) -> Self {
        Self {
            id: "byFrameRefID".to_string(),
            options: Value::String(ref_id.into()),
        }
    }
}

/// A single overridden property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideProperty {
    pub id: String,
    pub value: Value,
}

impl OverrideProperty {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    pub fn unit(unit: impl Into<String>) -> Self {
        Self::new("unit", Value::String(unit.into()))
    }

    pub fn display_name(name: impl Into<String>) -> Self {
        Self::new("displayName", Value::String(name.into()))
    }

    pub fn decimals(decimals: u8) -> Self {
        Self::new("decimals", json!(decimals))
    }
}

/// Override block: a matcher plus the properties it sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    pub matcher: FieldMatcher,
    pub properties: Vec<OverrideProperty>,
}
