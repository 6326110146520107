//! Error types for the Ratekeeper library.

use thiserror::Error;

/// Main error type for Ratekeeper operations.
///
/// The limiting engine itself has no recoverable runtime errors; every
/// variant here is surfaced at construction or configuration-loading time.
#[derive(Error, Debug)]
pub enum RatekeeperError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecognized algorithm selector
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Ratekeeper operations.
pub type Result<T> = std::result::Result<T, RatekeeperError>;
