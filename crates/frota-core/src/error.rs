//! Error types for the frota-core library.
//!
//! Classification and field extraction never fail; these errors only cover
//! the edges around them (payload decoding, config and session files, and
//! misuse of the extraction session state machine).

use thiserror::Error;

/// Main error type for the frota library.
#[derive(Error, Debug)]
pub enum FrotaError {
    /// Extraction session error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Document payload could not be decoded.
    #[error("invalid document payload: {0}")]
    Payload(String),

    /// Session store error.
    #[error("session error: {0}")]
    Session(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the invoice extraction session.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    /// A transition was requested from a state that does not allow it.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition { action: &'static str, state: String },
}

/// Result type for the frota library.
pub type Result<T> = std::result::Result<T, FrotaError>;
