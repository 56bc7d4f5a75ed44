//! Error types for Grantgate Core.

use thiserror::Error;

/// Core errors that can occur during grant and token operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid grant key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    Encryption,

    /// Ciphertext was truncated, tampered with, or sealed under another key.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// A grant token could not be opened.
    ///
    /// Deliberately carries no detail: base64, decryption, UTF-8 and JSON
    /// failures all collapse into this one variant.
    #[error("invalid grant token")]
    InvalidToken,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
