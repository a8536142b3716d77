//! Recording-rule deduplication and rule file output.
//!
//! Dashboards register their PromQL queries in a [`RecordingMap`] while they
//! are built. Identical queries (after whitespace normalization) collapse
//! into one recording rule, panels reference the rule name, and the map is
//! written out as a Prometheus rule file or a `PrometheusRule` resource.

pub mod document;
pub mod error;
pub mod map;
pub mod render;
pub mod writer;

pub use document::{
    PrometheusRuleResource, RecordingRule, ResourceMetadata, RuleGroup, RuleGroups,
    PROMETHEUS_RULE_API_VERSION, PROMETHEUS_RULE_KIND,
};
pub use error::{RulesError, RulesResult};
pub use map::{normalize_expr, RecordingMap, RuleDigest};
pub use render::{direct_ref_id, TargetPair};
pub use writer::RuleValidator;
