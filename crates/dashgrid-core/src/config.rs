//! Declarative layout configuration.
//!
//! A `Configuration` is never mutated in place by the engine. Every change is
//! expressed as a `ConfigPatch` and applied through `Configuration::apply`,
//! which returns the next, normalized configuration.

use crate::error::Result;
use crate::packet::TimeRange;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default display length when the layout does not specify one (1 hour).
pub const DEFAULT_RANGE_LENGTH_SECS: f64 = 3600.0;

/// Grid dimensions. Both are always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub rows: u32,
    pub columns: u32,
}

impl Grid {
    /// Create a grid, clamping zero dimensions to 1.
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows: rows.max(1),
            columns: columns.max(1),
        }
    }

    /// Number of cells in the nominal grid.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: 1,
            columns: 1,
        }
    }
}

#[derive(Deserialize)]
struct RawGrid {
    #[serde(default)]
    rows: Option<Value>,
    #[serde(default)]
    columns: Option<Value>,
}

/// Parse one grid dimension; anything absent or below 1 becomes 1.
fn grid_dimension(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f.floor() as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| *n >= 1)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(1)
}

impl<'de> Deserialize<'de> for Grid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<RawGrid>::deserialize(deserializer)?;
        Ok(match raw {
            Some(raw) => Self {
                rows: grid_dimension(raw.rows.as_ref()),
                columns: grid_dimension(raw.columns.as_ref()),
            },
            None => Self::default(),
        })
    }
}

/// Operating mode of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Full editing.
    #[default]
    Normal,
    /// Layout editing allowed, state-mutating controls hidden.
    Protected,
    /// View only.
    Display,
}

impl Mode {
    /// Parse a mode tag. Unknown or absent tags fall back to `Normal`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("protected") => Self::Protected,
            Some("display") => Self::Display,
            _ => Self::Normal,
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_tag(tag.as_deref()))
    }
}

/// Initial display range declared by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSetting {
    /// Length in seconds.
    #[serde(default = "default_range_length")]
    pub length: f64,
    /// End of the range in epoch seconds. `None` means "now".
    #[serde(default)]
    pub to: Option<f64>,
}

fn default_range_length() -> f64 {
    DEFAULT_RANGE_LENGTH_SECS
}

impl Default for RangeSetting {
    fn default() -> Self {
        Self {
            length: default_range_length(),
            to: None,
        }
    }
}

impl RangeSetting {
    /// Resolve against the current time.
    pub fn resolve(&self, now: f64) -> TimeRange {
        let length = if self.length.is_finite() && self.length > 0.0 {
            self.length
        } else {
            DEFAULT_RANGE_LENGTH_SECS
        };
        TimeRange::ending_at(self.to.unwrap_or(now), length)
    }
}

/// Layout-wide control block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Control {
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeSetting>,
}

impl Control {
    /// Whether any editing affordance may be shown.
    pub fn editing_allowed(&self) -> bool {
        !self.immutable && self.mode != Mode::Display
    }

    /// Whether controls that mutate remote state may be shown.
    pub fn state_controls_allowed(&self) -> bool {
        self.editing_allowed() && self.mode != Mode::Protected
    }

    /// Whether the "add panel" affordance is offered.
    pub fn add_panel_allowed(&self) -> bool {
        self.editing_allowed() && self.mode == Mode::Normal
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One panel entry of the layout.
///
/// Only `type` and `deleted` are interpreted by the engine; every other field
/// belongs to the panel implementation and is kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub panel_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PanelConfig {
    pub fn new(panel_type: impl Into<String>) -> Self {
        Self {
            panel_type: Some(panel_type.into()),
            deleted: false,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Free-form project metadata handed to every panel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMetadata(pub Map<String, Value>);

impl ProjectMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }
}

/// Explicit change to a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigPatch {
    SetGrid { rows: u32, columns: u32 },
    SetMode(Mode),
    SetImmutable(bool),
    SetRange(Option<RangeSetting>),
    AddPanel(PanelConfig),
    ReplacePanel { index: usize, config: PanelConfig },
    RemovePanel { index: usize },
    ReplacePanels(Vec<PanelConfig>),
}

/// Complete layout configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub control: Control,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
    #[serde(default)]
    pub project: ProjectMetadata,
}

impl Configuration {
    /// Parse a JSON layout and normalize it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.normalize())
    }

    /// Prune deleted panels. Grid dimensions are already >= 1 by construction.
    pub fn normalize(mut self) -> Self {
        self.panels.retain(|p| !p.deleted);
        self
    }

    /// Apply a patch and return the next normalized configuration.
    ///
    /// Out-of-range panel indices leave the configuration unchanged.
    pub fn apply(mut self, patch: ConfigPatch) -> Self {
        match patch {
            ConfigPatch::SetGrid { rows, columns } => {
                self.control.grid = Grid::new(rows, columns);
            }
            ConfigPatch::SetMode(mode) => self.control.mode = mode,
            ConfigPatch::SetImmutable(immutable) => self.control.immutable = immutable,
            ConfigPatch::SetRange(range) => self.control.range = range,
            ConfigPatch::AddPanel(config) => self.panels.push(config),
            ConfigPatch::ReplacePanel { index, config } => {
                if let Some(slot) = self.panels.get_mut(index) {
                    *slot = config;
                }
            }
            ConfigPatch::RemovePanel { index } => {
                if let Some(slot) = self.panels.get_mut(index) {
                    slot.deleted = true;
                }
            }
            ConfigPatch::ReplacePanels(panels) => self.panels = panels,
        }
        self.normalize()
    }

    /// Display range the layout starts with.
    pub fn initial_range(&self, now: f64) -> TimeRange {
        self.control.range.unwrap_or_default().resolve(now)
    }
}
