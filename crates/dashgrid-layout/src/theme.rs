//! Theme injected by the host.

use serde::{Deserialize, Serialize};

/// Style values the composer needs. The host supplies them; the engine never
/// inspects rendering state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Margin around the layout area on each side.
    #[serde(default = "default_margin_px")]
    pub margin_px: u32,
    /// Font size at 100% scale.
    #[serde(default = "default_base_font_px")]
    pub base_font_px: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

fn default_margin_px() -> u32 {
    10
}

fn default_base_font_px() -> f64 {
    14.0
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            margin_px: default_margin_px(),
            base_font_px: default_base_font_px(),
            font_family: default_font_family(),
        }
    }
}

impl Theme {
    /// Font size for a scale in percent.
    pub fn font_px(&self, scale_percent: f64) -> f64 {
        self.base_font_px * scale_percent / 100.0
    }
}
