//! # Grantgate Core
//!
//! Pure primitives for Grantgate: grants, access decisions, audit events,
//! and the sealed grant-token format.
//!
//! This crate contains no storage and no networking.
//!
//! ## Key Types
//!
//! - [`Grant`] - A path-scoped, time-limited access capability
//! - [`AccessDecision`] - Which identity is responsible for a download
//! - [`DownloadEvent`] - Immutable audit record of one download attempt
//! - [`AuthenticatedEncrypter`] - ChaCha20-Poly1305 sealing under the grant key
//!
//! ## Grant Tokens
//!
//! A grant link carries only the grant id, sealed under the server key. See
//! the [`token`] module for the exact wire form.

pub mod access;
pub mod crypto;
pub mod error;
pub mod event;
pub mod grant;
pub mod token;
pub mod types;

pub use access::{AccessDecision, AccessType};
pub use crypto::{digest_hex, AuthenticatedEncrypter, GrantKey, KEY_LEN};
pub use error::{CoreError, Result};
pub use event::DownloadEvent;
pub use grant::{Grant, GrantCheck, GrantType, NewGrant};
pub use token::{decode_token, encode_token, pad_plaintext, GrantInfo, PAD_BLOCK};
pub use types::{expiry_after_hours, now_millis, GrantId, MILLIS_PER_HOUR};
