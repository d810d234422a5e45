//! "Add panel" flow.
//!
//! Type selection lists the registry's descriptors. Choosing a type yields
//! that kind's construction rows; completing the form yields the patch that
//! appends the new panel.

use crate::error::LayoutResult;
use dashgrid_core::ConfigPatch;
use dashgrid_registry::{
    ConstructContext, ConstructRow, InputKind, PanelDescriptor, PanelError, PanelKind,
    PanelRegistry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Type-selection dialog.
pub struct AddPanelDialog {
    registry: Arc<PanelRegistry>,
    context: ConstructContext,
}

impl AddPanelDialog {
    pub fn new(registry: Arc<PanelRegistry>, context: ConstructContext) -> Self {
        Self { registry, context }
    }

    /// Selectable types in registration order.
    pub fn choices(&self) -> Vec<PanelDescriptor> {
        self.registry.descriptors()
    }

    /// Pick a type and build its input form.
    pub fn select(&self, type_tag: &str) -> LayoutResult<ConstructForm> {
        let kind = self.registry.resolve(Some(type_tag))?;
        let rows = kind.construct_rows(&self.context);
        Ok(ConstructForm {
            descriptor: kind.describe(),
            rows,
            kind,
        })
    }
}

/// Input form of one panel type.
pub struct ConstructForm {
    pub descriptor: PanelDescriptor,
    pub rows: Vec<ConstructRow>,
    kind: Arc<dyn PanelKind>,
}

impl ConstructForm {
    /// Initial input values.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .map(|row| {
                let value = match &row.input {
                    InputKind::Text { default } => default.clone(),
                    InputKind::Choice { options } | InputKind::Channel { options } => {
                        options.first().cloned().unwrap_or_default()
                    }
                };
                (row.key.clone(), value)
            })
            .collect()
    }

    /// Validate the inputs and build the patch appending the new panel.
    pub fn complete(&self, inputs: &BTreeMap<String, String>) -> LayoutResult<ConfigPatch> {
        for row in &self.rows {
            let value = inputs.get(&row.key).map(String::as_str).unwrap_or("");
            match &row.input {
                InputKind::Channel { .. } if value.trim().is_empty() => {
                    return Err(invalid(&row.key, "a channel is required"));
                }
                InputKind::Choice { options } if !options.iter().any(|o| o == value) => {
                    return Err(invalid(&row.key, "not one of the offered choices"));
                }
                _ => {}
            }
        }

        let config = self.kind.build_config(inputs)?;
        info!(type_tag = %self.descriptor.type_tag, "New panel configured");
        Ok(ConfigPatch::AddPanel(config))
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::LayoutError {
    PanelError::InvalidInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
