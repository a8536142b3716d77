//! Typed dashboard model and builder helpers.
//!
//! Provides the minimal document model the rest of the workspace builds on:
//! - `Dashboard`, `Row`, `Panel`: dashboard structure and grid layout
//! - `PrometheusTarget`, `TargetOptions`: panel queries
//! - `FieldOverride`, `FieldMatcher`: per-field display overrides
//! - `Variable`: template variables
//! - helpers for color overrides, text defaults and quoting

pub mod dashboard;
pub mod error;
pub mod field;
pub mod helpers;
pub mod panel;
pub mod target;
pub mod variable;

pub use dashboard::{Dashboard, Row, TimeRange};
pub use error::{CoreError, CoreResult};
pub use field::{FieldConfig, FieldDefaults, FieldMatcher, FieldOverride, OverrideProperty};
pub use helpers::{
    as_quoted, continuous_color_scheme, stat_field_override, variable_as_text_default,
    ColorScheme, DashboardConstant, DashboardVariable, Pixel,
};
pub use panel::{DatasourceRef, GridPos, Panel, PanelKind};
pub use target::{PrometheusTarget, TargetFormat, TargetOptions};
pub use variable::{CurrentValue, Variable, VariableKind, VariableOption};
