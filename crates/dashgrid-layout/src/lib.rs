//! dashgrid-layout - Grid composition for the dashgrid engine.
//!
//! Turns a declarative `Configuration` into panel slots:
//!
//! - Cell geometry from the viewport, the theme margin and the grid size
//! - Font scaling that keeps dense grids legible
//! - Mode gating of editing and state-changing affordances
//! - The "add panel" flow: type selection, construction rows, config patch
//!
//! # Architecture
//!
//! ```text
//! Configuration ──┐
//! Viewport ───────┼──► GridComposer ──► Composition { ComposedPanel* }
//! Theme ──────────┘         │
//!                           └── PanelRegistry (type tag → PanelKind)
//! ```
//!
//! The composer never configures panels. It resolves and creates them; the
//! orchestrator binds each one to its callbacks.

mod composer;
mod dialog;
mod error;
mod geometry;
mod theme;

pub use composer::{ComposedPanel, Composition, GridComposer, SkippedPanel};
pub use dialog::{AddPanelDialog, ConstructForm};
pub use error::{LayoutError, LayoutResult};
pub use geometry::{font_scale_percent, GridGeometry, Viewport};
pub use theme::Theme;
