//! Slot geometry.

use dashgrid_core::{Grid, Rect};
use serde::{Deserialize, Serialize};

/// Space available to the layout, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Font scale in percent for a column count.
///
/// Up to two columns keep full size, three use 80%, and denser grids shrink
/// as `100 / (columns - 2)`.
pub fn font_scale_percent(columns: u32) -> f64 {
    match columns {
        0..=2 => 100.0,
        3 => 80.0,
        n => 100.0 / f64::from(n - 2),
    }
}

/// Computed cell layout for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub grid: Grid,
    /// Layout area after the margin.
    pub inner: Rect,
    pub cell_width: u32,
    pub cell_height: u32,
    pub font_scale_percent: f64,
}

impl GridGeometry {
    pub fn compute(grid: Grid, viewport: Viewport, margin_px: u32) -> Self {
        let grid = Grid::new(grid.rows, grid.columns);
        let inner = Rect {
            x: margin_px,
            y: margin_px,
            width: viewport.width.saturating_sub(margin_px.saturating_mul(2)),
            height: viewport.height.saturating_sub(margin_px.saturating_mul(2)),
        };
        Self {
            grid,
            inner,
            cell_width: inner.width / grid.columns,
            cell_height: inner.height / grid.rows,
            font_scale_percent: font_scale_percent(grid.columns),
        }
    }

    /// Rectangle of the `index`-th slot, row-major.
    ///
    /// Slots past `rows * columns` continue on further rows below the grid.
    pub fn cell_rect(&self, index: usize) -> Rect {
        let columns = self.grid.columns as usize;
        let row = u32::try_from(index / columns).unwrap_or(u32::MAX);
        let col = (index % columns) as u32;
        Rect {
            x: self.inner.x.saturating_add(col.saturating_mul(self.cell_width)),
            y: self.inner.y.saturating_add(row.saturating_mul(self.cell_height)),
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}
