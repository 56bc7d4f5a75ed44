//! Error types for the gate.

use grantgate_core::CoreError;
use grantgate_store::StoreError;
use thiserror::Error;

/// Why a request failed credential checks.
///
/// Kept for diagnostics only. Both variants render identically, so a client
/// cannot tell a wrong grant from a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    /// Neither a session nor a grant token was presented.
    NoCredentials,
    /// A grant token was presented but is malformed, unknown, bound to
    /// another path, or expired.
    InvalidCredentials,
}

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("unauthorized")]
    Unauthorized(CredentialFailure),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid query parameter {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    /// I/O failure or client disconnect while streaming.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// Upstream gating was bypassed; a programming or deployment error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// HTTP status code a front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Unauthorized(_) => 401,
            GateError::NotFound(_) => 404,
            GateError::InvalidParameter { .. } => 400,
            _ => 500,
        }
    }
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures_look_the_same() {
        let none = GateError::Unauthorized(CredentialFailure::NoCredentials);
        let bad = GateError::Unauthorized(CredentialFailure::InvalidCredentials);

        assert_eq!(none.to_string(), bad.to_string());
        assert_eq!(none.status_code(), 401);
        assert_eq!(bad.status_code(), 401);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GateError::NotFound("a.pdf".into()).status_code(), 404);
        assert_eq!(
            GateError::InvariantViolation("no identity".into()).status_code(),
            500
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(GateError::Transport(io).status_code(), 500);
    }
}
