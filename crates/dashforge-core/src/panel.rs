//! Panels and their grid placement.

use crate::error::{CoreError, CoreResult};
use crate::field::{FieldConfig, FieldMatcher, FieldOverride, OverrideProperty};
use crate::helpers::Pixel;
use crate::target::{auto_ref_id, PrometheusTarget, TargetOptions};
use serde::Serialize;
use serde_json::{json, Value};

/// Grid width of a dashboard in columns.
pub const GRID_COLUMNS: u32 = 24;

/// Pixel height of one grid row.
pub const GRID_ROW_PX: u32 = 30;

/// Default panel height.
pub const DEFAULT_PANEL_HEIGHT: Pixel = Pixel(240);

/// Panel visualization type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanelKind {
    #[serde(rename = "timeseries")]
    TimeSeries,
    #[serde(rename = "stat")]
    Stat,
    #[serde(rename = "gauge")]
    Gauge,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "heatmap")]
    Heatmap,
    #[serde(rename = "graph")]
    Graph,
    #[serde(rename = "singlestat")]
    SingleStat,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "row")]
    Row,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeSeries => "timeseries",
            Self::Stat => "stat",
            Self::Gauge => "gauge",
            Self::Table => "table",
            Self::Heatmap => "heatmap",
            Self::Graph => "graph",
            Self::SingleStat => "singlestat",
            Self::Text => "text",
            Self::Row => "row",
        }
    }

    /// Whether the kind renders query results.
    pub fn accepts_targets(&self) -> bool {
        !matches!(self, Self::Text | Self::Row)
    }
}

/// Position on the dashboard grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Reference to the datasource a panel queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl DatasourceRef {
    pub fn prometheus(uid: impl Into<String>) -> Self {
        Self {
            kind: "prometheus".to_string(),
            uid: uid.into(),
        }
    }
}

/// A dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub(crate) id: u32,
    #[serde(rename = "type")]
    kind: PanelKind,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datasource: Option<DatasourceRef>,
    pub(crate) grid_pos: GridPos,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    targets: Vec<PrometheusTarget>,
    field_config: FieldConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collapsed: Option<bool>,
    /// Children of a collapsed row header.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) panels: Vec<Panel>,
    #[serde(skip)]
    span: u8,
    #[serde(skip)]
    height: Pixel,
}

impl Panel {
    pub fn new(kind: PanelKind, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind,
            title: title.into(),
            description: None,
            datasource: None,
            grid_pos: GridPos::default(),
            targets: Vec::new(),
            field_config: FieldConfig::default(),
            options: None,
            collapsed: None,
            panels: Vec::new(),
            span: 6,
            height: DEFAULT_PANEL_HEIGHT,
        }
    }

    pub fn time_series(title: impl Into<String>) -> Self {
        Self::new(PanelKind::TimeSeries, title)
    }

    pub fn stat(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Stat, title)
    }

    pub fn gauge(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Gauge, title)
    }

    pub fn table(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Table, title)
    }

    pub fn heatmap(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Heatmap, title)
    }

    pub fn graph(title: impl Into<String>) -> Self {
        Self::new(PanelKind::Graph, title)
    }

    pub fn single_stat(title: impl Into<String>) -> Self {
        Self::new(PanelKind::SingleStat, title)
    }

    /// Markdown text panel.
    pub fn text(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        let mut panel = Self::new(PanelKind::Text, title);
        panel.options = Some(json!({ "mode": "markdown", "content": markdown.into() }));
        panel
    }

    pub(crate) fn row_header(title: &str, collapsed: bool) -> Self {
        let mut panel = Self::new(PanelKind::Row, title);
        panel.span = 12;
        panel.height = Pixel(GRID_ROW_PX);
        panel.collapsed = Some(collapsed);
        panel
    }

    /// Width in half-columns: 12 spans the whole dashboard.
    pub fn span(mut self, span: u8) -> CoreResult<Self> {
        if !(1..=12).contains(&span) {
            return Err(CoreError::InvalidSpan(span));
        }
        self.span = span;
        Ok(self)
    }

    #[must_use]
    pub fn height(mut self, height: Pixel) -> Self {
        self.height = height;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn datasource(mut self, uid: impl Into<String>) -> Self {
        self.datasource = Some(DatasourceRef::prometheus(uid));
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.field_config.defaults.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn decimals(mut self, decimals: u8) -> Self {
        self.field_config.defaults.decimals = Some(decimals);
        self
    }

    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.field_config.defaults.min = Some(min);
        self.field_config.defaults.max = Some(max);
        self
    }

    /// Append a target built from `expr` and `options`.
    pub fn with_prometheus_target(
        mut self,
        expr: impl Into<String>,
        options: TargetOptions,
    ) -> CoreResult<Self> {
        self.add_prometheus_target(PrometheusTarget::new(expr, options)?)?;
        Ok(self)
    }

    /// Append a target, assigning the next free ref id when it has none.
    ///
    /// Rejects targets on text/row panels and ref ids already in use.
    pub fn add_prometheus_target(&mut self, mut target: PrometheusTarget) -> CoreResult<()> {
        if !self.kind.accepts_targets() {
            return Err(CoreError::WrongPanelKind {
                expected: "query",
                actual: self.kind.as_str(),
            });
        }

        if target.ref_id.is_empty() {
            target.ref_id = self.next_ref_id();
        } else if self.targets.iter().any(|t| t.ref_id == target.ref_id) {
            return Err(CoreError::DuplicateRefId {
                panel: self.title.clone(),
                ref_id: target.ref_id,
            });
        }

        self.targets.push(target);
        Ok(())
    }

    fn next_ref_id(&self) -> String {
        (self.targets.len()..)
            .map(auto_ref_id)
            .find(|candidate| self.targets.iter().all(|t| &t.ref_id != candidate))
            .unwrap_or_default()
    }

    pub fn field_override(&mut self, matcher: FieldMatcher, properties: Vec<OverrideProperty>) {
        self.field_config.overrides.push(FieldOverride {
            matcher,
            properties,
        });
    }

    #[must_use]
    pub fn with_field_override(
        mut self,
        matcher: FieldMatcher,
        properties: Vec<OverrideProperty>,
    ) -> Self {
        self.field_override(matcher, properties);
        self
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn targets(&self) -> &[PrometheusTarget] {
        &self.targets
    }

    pub fn field_config(&self) -> &FieldConfig {
        &self.field_config
    }

    pub fn grid_pos(&self) -> GridPos {
        self.grid_pos
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Width in grid columns.
    pub fn grid_width(&self) -> u32 {
        u32::from(self.span) * 2
    }

    /// Height in grid rows, at least one.
    pub fn grid_height(&self) -> u32 {
        self.height.0.div_ceil(GRID_ROW_PX).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_ids_assigned_in_order() {
        let panel = Panel::time_series("Requests")
            .with_prometheus_target("rate(http_requests_total[5m])", TargetOptions::new())
            .unwrap()
            .with_prometheus_target("up", TargetOptions::new())
            .unwrap();

        let refs: Vec<_> = panel.targets().iter().map(|t| t.ref_id.as_str()).collect();
        assert_eq!(refs, vec!["A", "B"]);
    }

    #[test]
    fn test_auto_ref_id_skips_explicit() {
        let panel = Panel::stat("Up")
            .with_prometheus_target("up", TargetOptions::new().ref_id("B"))
            .unwrap()
            .with_prometheus_target("up == 0", TargetOptions::new())
            .unwrap()
            .with_prometheus_target("up == 1", TargetOptions::new())
            .unwrap();

        let refs: Vec<_> = panel.targets().iter().map(|t| t.ref_id.as_str()).collect();
        assert_eq!(refs, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_duplicate_ref_id_rejected() {
        let result = Panel::table("Jobs")
            .with_prometheus_target("up", TargetOptions::new().ref_id("jobs"))
            .unwrap()
            .with_prometheus_target("up", TargetOptions::new().ref_id("jobs"));

        assert!(matches!(result, Err(CoreError::DuplicateRefId { .. })));
    }

    #[test]
    fn test_text_panel_rejects_targets() {
        let result = Panel::text("Notes", "# hello").with_prometheus_target("up", TargetOptions::new());
        assert!(matches!(result, Err(CoreError::WrongPanelKind { .. })));
    }

    #[test]
    fn test_span_validation() {
        assert!(Panel::gauge("g").span(0).is_err());
        assert!(Panel::gauge("g").span(13).is_err());
        assert_eq!(Panel::gauge("g").span(12).unwrap().grid_width(), 24);
    }

    #[test]
    fn test_grid_height_rounds_up() {
        assert_eq!(Panel::graph("g").height(Pixel(300)).grid_height(), 10);
        assert_eq!(Panel::graph("g").height(Pixel(301)).grid_height(), 11);
        assert_eq!(Panel::graph("g").height(Pixel(0)).grid_height(), 1);
    }

    #[test]
    fn test_panel_json_shape() {
        let panel = Panel::stat("Up")
            .datasource("prom")
            .unit("short")
            .with_prometheus_target("up", TargetOptions::new())
            .unwrap();
        let value = serde_json::to_value(&panel).unwrap();

        assert_eq!(value["type"], "stat");
        assert_eq!(value["datasource"]["uid"], "prom");
        assert_eq!(value["targets"][0]["refId"], "A");
        assert_eq!(value["fieldConfig"]["defaults"]["unit"], "short");
        assert!(value.get("span").is_none());
        assert!(value.get("gridPos").is_some());
    }
}
