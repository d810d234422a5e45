//! Layout error types.

use dashgrid_registry::{PanelError, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("Adding panels is not allowed in this mode")]
    AddPanelNotAllowed,
}

pub type LayoutResult<T> = Result<T, LayoutError>;
