//! Axum route handlers for the HTTP API.

pub mod artifacts;
pub mod entitlements;
pub mod retention;
pub mod tokens;
