//! Panel plugin contract and type registry for dashgrid.
//!
//! Every panel type implements two traits:
//! - `PanelKind`: static side (descriptor, construction rows, factory)
//! - `Panel`: one live instance bound to a grid slot
//!
//! `PanelRegistry` maps (alias-normalized) type tags to kinds. The channel
//! catalog client feeds construction rows with the server's channel list.

pub mod catalog;
pub mod contract;
pub mod error;
pub mod registry;

pub use catalog::{CatalogClient, ChannelInfo};
pub use contract::{
    ConstructContext, ConstructRow, InputKind, Panel, PanelCallbacks, PanelDescriptor, PanelKind,
    PanelMessage, PanelRequest,
};
pub use error::{PanelError, PanelResult, RegistryError, RegistryResult};
pub use registry::{PanelRegistry, DEFAULT_PANEL_TYPE};
