//! Integration test helpers for Daily Darshan.
//!
//! The actual tests live in `tests/` and are `#[ignore]`d because they
//! need a running server (`cargo run -p daily-darshan-server`) and a
//! migrated database.

#![cfg_attr(not(test), forbid(unsafe_code))]

/// Base URL for the server (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("DARSHAN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
