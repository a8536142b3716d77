//! Dashboard document and grid layout.
//!
//! A [`Dashboard`] is assembled from free-standing panels and [`Row`]s. When
//! serialized it renders the platform's JSON model: panels are numbered in
//! order and flowed left-to-right over a 24-column grid, wrapping when a
//! panel no longer fits on the current line. Each row starts on a fresh line
//! with a full-width header.

use crate::error::{CoreError, CoreResult};
use crate::panel::{GridPos, Panel, GRID_COLUMNS};
use crate::variable::Variable;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Dashboard JSON schema version emitted.
pub const SCHEMA_VERSION: u32 = 39;

/// Maximum length of a dashboard uid accepted by the platform.
pub const MAX_UID_LEN: usize = 40;

const UID_DIGEST_BYTES: usize = 10;

/// Relative time range shown by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            from: "now-6h".to_string(),
            to: "now".to_string(),
        }
    }
}

/// A titled group of panels.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    title: String,
    collapsed: bool,
    panels: Vec<Panel>,
}

impl Row {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            collapsed: false,
            panels: Vec::new(),
        }
    }

    /// Render the row folded; its panels move inside the header.
    #[must_use]
    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    #[must_use]
    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    pub fn add_panel(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }
}

/// A dashboard definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    uid: String,
    title: String,
    tags: Vec<String>,
    editable: bool,
    refresh: Option<String>,
    time: TimeRange,
    timezone: String,
    variables: Vec<Variable>,
    panels: Vec<Panel>,
    rows: Vec<Row>,
}

impl Dashboard {
    /// Create a dashboard; the uid defaults to a slug of the title.
    pub fn new(title: impl Into<String>) -> CoreResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CoreError::EmptyTitle);
        }

        Ok(Self {
            uid: default_uid(&title),
            title,
            tags: Vec::new(),
            editable: true,
            refresh: None,
            time: TimeRange::default(),
            timezone: "browser".to_string(),
            variables: Vec::new(),
            panels: Vec::new(),
            rows: Vec::new(),
        })
    }

    /// Set an explicit uid, truncated to the platform limit.
    #[must_use]
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        let mut uid: String = uid.into();
        if uid.len() > MAX_UID_LEN {
            let mut cut = MAX_UID_LEN;
            while !uid.is_char_boundary(cut) {
                cut -= 1;
            }
            uid.truncate(cut);
        }
        self.uid = uid;
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    #[must_use]
    pub fn auto_refresh(mut self, interval: impl Into<String>) -> Self {
        self.refresh = Some(interval.into());
        self
    }

    #[must_use]
    pub fn time(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time = TimeRange {
            from: from.into(),
            to: to.into(),
        };
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Add a template variable; names must be unique.
    pub fn variable(mut self, variable: Variable) -> CoreResult<Self> {
        if self.variables.iter().any(|v| v.name == variable.name) {
            return Err(CoreError::DuplicateVariable(variable.name));
        }
        self.variables.push(variable);
        Ok(self)
    }

    /// Add a panel outside of any row. Such panels are placed before rows.
    #[must_use]
    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    #[must_use]
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn uid_str(&self) -> &str {
        &self.uid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of query panels, row headers excluded.
    pub fn panel_count(&self) -> usize {
        self.panels.len() + self.rows.iter().map(|r| r.panels.len()).sum::<usize>()
    }

    /// Render the platform JSON model.
    pub fn to_json(&self) -> CoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty-printed platform JSON.
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn layout(&self) -> Vec<Panel> {
        let mut grid = GridCursor::default();
        let mut out = Vec::with_capacity(self.panel_count() + self.rows.len());

        for panel in &self.panels {
            out.push(grid.place(panel.clone()));
        }
        for row in &self.rows {
            grid.new_line();
            let mut header = grid.place(Panel::row_header(&row.title, row.collapsed));
            grid.new_line();
            if row.collapsed {
                // positions used once the row is expanded
                let mut nested = GridCursor {
                    y: grid.y,
                    ..GridCursor::default()
                };
                header.panels = row.panels.iter().map(|p| nested.place(p.clone())).collect();
                out.push(header);
            } else {
                out.push(header);
                for panel in &row.panels {
                    out.push(grid.place(panel.clone()));
                }
            }
        }

        let mut next_id = 1;
        for panel in &mut out {
            panel.id = next_id;
            next_id += 1;
            for child in &mut panel.panels {
                child.id = next_id;
                next_id += 1;
            }
        }

        debug!(
            uid = %self.uid,
            panels = out.len(),
            height = grid.y + grid.line_height,
            "Laid out dashboard"
        );
        out
    }
}

#[derive(Default)]
struct GridCursor {
    x: u32,
    y: u32,
    line_height: u32,
}

impl GridCursor {
    fn new_line(&mut self) {
        if self.x > 0 || self.line_height > 0 {
            self.y += self.line_height;
        }
        self.x = 0;
        self.line_height = 0;
    }

    fn place(&mut self, mut panel: Panel) -> Panel {
        let w = panel.grid_width().min(GRID_COLUMNS);
        let h = panel.grid_height();
        if self.x + w > GRID_COLUMNS {
            self.new_line();
        }
        panel.grid_pos = GridPos {
            x: self.x,
            y: self.y,
            w,
            h,
        };
        self.x += w;
        self.line_height = self.line_height.max(h);
        panel
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardModel<'a> {
    uid: &'a str,
    title: &'a str,
    tags: &'a [String],
    editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh: Option<&'a str>,
    time: &'a TimeRange,
    timezone: &'a str,
    schema_version: u32,
    templating: Templating<'a>,
    panels: Vec<Panel>,
}

#[derive(Serialize)]
struct Templating<'a> {
    list: &'a [Variable],
}

impl Serialize for Dashboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DashboardModel {
            uid: &self.uid,
            title: &self.title,
            tags: &self.tags,
            editable: self.editable,
            refresh: self.refresh.as_deref(),
            time: &self.time,
            timezone: &self.timezone,
            schema_version: SCHEMA_VERSION,
            templating: Templating {
                list: &self.variables,
            },
            panels: self.layout(),
        }
        .serialize(serializer)
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(MAX_UID_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Slug of the title, or a short digest of it when nothing slugs.
fn default_uid(title: &str) -> String {
    let slug = slugify(title);
    if !slug.is_empty() {
        return slug;
    }
    let digest = Sha256::digest(title.as_bytes());
    hex::encode(&digest[..UID_DIGEST_BYTES])
}
