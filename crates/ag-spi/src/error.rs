//! Error type for SPI operations.

use thiserror::Error;

/// Result type alias for SPI operations.
pub type SpiResult<T> = std::result::Result<T, SpiError>;

/// Error type for SPI operations.
#[derive(Debug, Error)]
pub enum SpiError {
    /// No builder is registered for the requested provider type.
    #[error("unknown provider type: {0}")]
    UnknownType(String),

    /// The definition's configuration blob failed validation.
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// The builder failed to construct a provider instance.
    #[error("provider creation failed: {0}")]
    Creation(String),

    /// A provider lifecycle hook failed.
    #[error("provider lifecycle error: {0}")]
    Lifecycle(String),

    /// The definition store could not be reached or returned an error.
    #[error("definition store error: {0}")]
    Store(String),
}

impl SpiError {
    /// Creates an invalid-configuration error from a serde failure.
    #[must_use]
    pub fn invalid_config(err: impl std::fmt::Display) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
