//! Integration tests for Copperleaf.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p copperleaf-cli -- migrate
//! cargo run -p copperleaf-cli -- seed
//!
//! # Start the storefront
//! cargo run -p copperleaf-storefront
//!
//! # Run integration tests (ignored by default)
//! cargo test -p copperleaf-integration-tests -- --ignored
//! ```
//!
//! The live-server tests read `STOREFRONT_TEST_URL` (default
//! `http://localhost:3000`) and, for webhook tests, `STRIPE_WEBHOOK_SECRET`
//! matching the running server's configuration.

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}
