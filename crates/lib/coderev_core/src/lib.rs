//! # coderev_core
//!
//! Core domain logic for Coderev: authenticated sessions backed by a
//! refresh-token ledger, and the AI code review pipeline.

pub mod auth;
pub mod db;
pub mod migrate;
pub mod models;
pub mod review;
pub mod uuid;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns the service banner shown on the API root.
pub fn banner() -> String {
    format!("Coderev AI code review API v{}", version())
}
