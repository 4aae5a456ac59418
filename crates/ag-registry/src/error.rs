//! Error type for registry operations.

use thiserror::Error;

use ag_spi::SpiError;

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `start` was called on a registry that is already running.
    #[error("registry already started")]
    AlreadyStarted,

    /// The definition store could not be bulk-loaded.
    #[error("bulk load failed: {0}")]
    BulkLoad(SpiError),

    /// A bootstrap-critical definition could not be deployed within the
    /// configured number of attempts.
    #[error("bootstrap deployment of '{id}' failed after {attempts} attempts: {message}")]
    BootstrapExhausted {
        /// The definition that could not be deployed.
        id: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last deployment error.
        message: String,
    },
}
