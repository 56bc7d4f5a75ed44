//! # Grantgate
//!
//! Grant-link authentication and audited delivery for exclusive files.
//!
//! ## Overview
//!
//! A creator (or a purchase handler) mints a **grant**: a server-side record
//! binding one request path to a tag and an expiry. The grant id is sealed
//! under a server key into a URL-safe token and handed out as a link.
//! Anyone holding the link can download that one file until the grant
//! expires; patrons with a session can download without one.
//!
//! Every download that reaches a real file leaves exactly one
//! [`DownloadEvent`](core::DownloadEvent) in the audit log, including
//! downloads that fail or are abandoned part-way. The recorded hash covers
//! exactly the bytes the client received.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grantgate::{BufferedResponse, ExclusiveGate, ExclusiveRequest, GateConfig};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = GateConfig::load("grantgate.toml")?;
//!     let gate = ExclusiveGate::open(&config)?;
//!
//!     let request = ExclusiveRequest::new("/exclusive/book.pdf", "203.0.113.9")
//!         .with_param("grant", "...");
//!     let mut response = BufferedResponse::new();
//!     match gate.handle(&request, &mut response).await {
//!         Ok(_) => println!("sent {} bytes", response.body().len()),
//!         Err(e) => println!("status {}", e.status_code()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `grantgate::core` - Grants, decisions, events and the token format
//! - `grantgate::store` - Grant and audit persistence

pub mod authenticator;
pub mod codec;
pub mod config;
pub mod content_type;
pub mod decision;
pub mod delivery;
pub mod error;
pub mod filter;
pub mod gate;
pub mod request;
pub mod response;
pub mod session;

pub use grantgate_core as core;
pub use grantgate_store as store;

pub use authenticator::{GrantAuthenticator, GrantValidation};
pub use codec::{GrantCodec, IssuedGrant};
pub use config::GateConfig;
pub use content_type::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use decision::{AccessDecisionEngine, AuthResult};
pub use delivery::{ContentDeliveryPipeline, DeliveryReport};
pub use error::{CredentialFailure, GateError, Result};
pub use filter::{ContentFilter, FilterContext, PassthroughFilter};
pub use gate::{ExclusiveGate, GateResponse};
pub use request::{ExclusiveRequest, EXPIRES_PARAM, GRANT_PARAM, GRANT_TAG_PARAM, ID_PARAM};
pub use response::{BufferedResponse, ResponseHead, ResponseSink};
pub use session::{PatronSession, SessionAuthenticator, StaticSessions};

pub use grantgate_core::{AccessDecision, AccessType, DownloadEvent, Grant, GrantId, GrantKey, GrantType};
