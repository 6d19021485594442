use thiserror::Error;

use quillcast_registry::RegistryError;

/// Errors that can occur in the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A registry read or bookkeeping update failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
