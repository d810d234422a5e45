//! Panel type registry.
//!
//! Holds the ordered list of panel kinds, loaded once at startup, and
//! resolves a configuration's type tag to a kind. Resolution is a pure
//! lookup: legacy aliases first, then the first kind with an equal tag.

use crate::contract::{PanelDescriptor, PanelKind};
use crate::error::{RegistryError, RegistryResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tag assumed when a panel entry has no `type`.
pub const DEFAULT_PANEL_TYPE: &str = "timeaxis";

/// Legacy tag renames understood out of the box.
const LEGACY_ALIASES: &[(&str, &str)] = &[("plot", "timeaxis"), ("table", "datatable")];

/// Registry of available panel implementations.
pub struct PanelRegistry {
    kinds: Vec<Arc<dyn PanelKind>>,
    aliases: HashMap<String, String>,
    default_type: String,
}

impl PanelRegistry {
    /// Empty registry with the built-in alias table.
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            aliases: LEGACY_ALIASES
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
            default_type: DEFAULT_PANEL_TYPE.to_string(),
        }
    }

    /// Load every kind from a plugin source, preserving its order.
    pub fn load<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PanelKind>>,
    {
        let mut registry = Self::new();
        for kind in source {
            registry.register(kind);
        }
        info!(
            count = registry.kinds.len(),
            types = ?registry.descriptors().iter().map(|d| d.type_tag.clone()).collect::<Vec<_>>(),
            "Panel registry loaded"
        );
        registry
    }

    pub fn register(&mut self, kind: Arc<dyn PanelKind>) {
        debug!(type_tag = %kind.describe().type_tag, "Registering panel kind");
        self.kinds.push(kind);
    }

    /// Add or override a legacy alias.
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    /// Change the tag assumed for entries without `type`.
    pub fn with_default_type(mut self, tag: impl Into<String>) -> Self {
        self.default_type = tag.into();
        self
    }

    pub fn kinds(&self) -> &[Arc<dyn PanelKind>] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<PanelDescriptor> {
        self.kinds.iter().map(|k| k.describe()).collect()
    }

    /// Map an absent or legacy tag to the current one.
    pub fn normalize_tag<'a>(&'a self, tag: Option<&'a str>) -> &'a str {
        match tag.map(str::trim).filter(|t| !t.is_empty()) {
            None => &self.default_type,
            Some(tag) => self.aliases.get(tag).map(String::as_str).unwrap_or(tag),
        }
    }

    /// Resolve a tag to the first matching kind.
    pub fn resolve(&self, tag: Option<&str>) -> RegistryResult<Arc<dyn PanelKind>> {
        let normalized = self.normalize_tag(tag);
        self.kinds
            .iter()
            .find(|k| k.describe().type_tag == normalized)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownPanelType(normalized.to_string()))
    }
}

impl Default for PanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
