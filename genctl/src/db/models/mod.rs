//! Database record structures matching table schemas.

pub mod artifacts;
pub mod token_grants;
pub mod trained_models;
pub mod users;
