//! Error types for the CLI

use conformance_common::telemetry::TelemetryError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failure reported by the conformance engine, including a failed run
    #[error(transparent)]
    Conformance(#[from] conformance_common::Error),

    /// Logging could not be set up
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Arguments that parse but make no sense together
    #[error("validation error: {message}")]
    Validation {
        /// What is wrong
        message: String,
    },
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
