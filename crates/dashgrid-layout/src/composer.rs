//! Grid composer.
//!
//! `compose` is a pure function of the configuration, the viewport and the
//! registry: it creates a fresh, unconfigured panel for every resolvable
//! entry. Entries whose type cannot be resolved are skipped and logged, and
//! do not take a cell.

use crate::dialog::AddPanelDialog;
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{GridGeometry, Viewport};
use crate::theme::Theme;
use dashgrid_core::{Affordances, Configuration, Control, PanelConfig, PanelSlot};
use dashgrid_registry::{ConstructContext, Panel, PanelRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A resolved panel and the slot it occupies.
pub struct ComposedPanel {
    pub slot: PanelSlot,
    pub config: PanelConfig,
    pub panel: Box<dyn Panel>,
}

impl fmt::Debug for ComposedPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedPanel")
            .field("slot", &self.slot)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A configuration entry that did not become a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPanel {
    pub config_index: usize,
    pub type_tag: String,
    pub reason: String,
}

/// Result of one composition.
#[derive(Debug)]
pub struct Composition {
    pub geometry: GridGeometry,
    pub panels: Vec<ComposedPanel>,
    pub skipped: Vec<SkippedPanel>,
    /// Whether the host should show the "add panel" affordance.
    pub add_panel: bool,
}

/// Builds panel slots from a configuration.
pub struct GridComposer {
    registry: Arc<PanelRegistry>,
    theme: Theme,
}

impl GridComposer {
    pub fn new(registry: Arc<PanelRegistry>, theme: Theme) -> Self {
        Self { registry, theme }
    }

    pub fn registry(&self) -> &Arc<PanelRegistry> {
        &self.registry
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Affordances every panel gets under `control`.
    pub fn affordances(control: &Control) -> Affordances {
        Affordances {
            editing: control.editing_allowed(),
            state_controls: control.state_controls_allowed(),
        }
    }

    pub fn compose(&self, config: &Configuration, viewport: Viewport) -> Composition {
        let geometry = GridGeometry::compute(config.control.grid, viewport, self.theme.margin_px);
        let affordances = Self::affordances(&config.control);

        let mut panels = Vec::with_capacity(config.panels.len());
        let mut skipped = Vec::new();

        for (config_index, panel_config) in config.panels.iter().enumerate() {
            if panel_config.deleted {
                continue;
            }

            let tag = panel_config.panel_type.as_deref();
            let kind = match self.registry.resolve(tag) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(config_index, error = %e, "Skipping panel");
                    skipped.push(SkippedPanel {
                        config_index,
                        type_tag: self.registry.normalize_tag(tag).to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let slot = PanelSlot {
                index: panels.len(),
                config_index,
                rect: geometry.cell_rect(panels.len()),
                font_scale_percent: geometry.font_scale_percent,
                affordances,
            };
            debug!(
                index = slot.index,
                type_tag = %kind.describe().type_tag,
                x = slot.rect.x,
                y = slot.rect.y,
                "Panel slot created"
            );

            panels.push(ComposedPanel {
                slot,
                config: panel_config.clone(),
                panel: kind.create(),
            });
        }

        let add_panel = config.control.add_panel_allowed();
        info!(
            rows = geometry.grid.rows,
            columns = geometry.grid.columns,
            panels = panels.len(),
            skipped = skipped.len(),
            add_panel,
            "Grid composed"
        );

        Composition {
            geometry,
            panels,
            skipped,
            add_panel,
        }
    }

    /// Open the type-selection dialog, if the mode allows adding panels.
    pub fn add_panel_dialog(
        &self,
        config: &Configuration,
        context: ConstructContext,
    ) -> LayoutResult<AddPanelDialog> {
        if !config.control.add_panel_allowed() {
            return Err(LayoutError::AddPanelNotAllowed);
        }
        Ok(AddPanelDialog::new(self.registry.clone(), context))
    }
}
