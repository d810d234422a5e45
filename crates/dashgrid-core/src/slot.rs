//! Rendered slot description.
//!
//! The engine does not paint anything itself. A slot carries the computed
//! geometry and the affordances the host should offer for one panel.

use serde::{Deserialize, Serialize};

/// Pixel rectangle inside the layout area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Controls a panel may expose in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Affordances {
    /// Layout editing (configure, delete, popout).
    pub editing: bool,
    /// Controls that change remote state (publish, control writes).
    pub state_controls: bool,
}

impl Affordances {
    pub const NONE: Self = Self {
        editing: false,
        state_controls: false,
    };

    pub const ALL: Self = Self {
        editing: true,
        state_controls: true,
    };
}

/// One composed grid cell bound to a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSlot {
    /// Position in the composed panel list.
    pub index: usize,
    /// Index of the panel entry in `Configuration::panels`.
    pub config_index: usize,
    pub rect: Rect,
    /// Font scale in percent of the theme's base size.
    pub font_scale_percent: f64,
    pub affordances: Affordances,
}
