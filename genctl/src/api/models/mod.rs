//! Request and response models for the HTTP API.

pub mod artifacts;
pub mod entitlements;
pub mod retention;
pub mod tokens;
pub mod users;
