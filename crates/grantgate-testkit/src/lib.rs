//! # Grantgate Testkit
//!
//! Testing utilities for Grantgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a gate over a temporary content root with known sessions
//! - **Generators**: Proptest strategies for paths, tags and grants
//! - **Sinks**: response sinks that fail or stall after a byte budget
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use grantgate_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new().await;
//!     fixture.write_file("book.pdf", b"%PDF");
//!     let issued = fixture.issue("book.pdf", "promo1", 1.0).await;
//!     println!("{}", issued.url);
//! }
//! ```
//!
//! The end-to-end scenarios live in this crate's `tests/` directory.

pub mod fixtures;
pub mod generators;
pub mod io;

pub use fixtures::{TestFixture, CLIENT_IP, CREATOR_ID, CREATOR_SESSION, PATRON_ID, PATRON_SESSION};
pub use io::{FailingSink, StallingSink};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
