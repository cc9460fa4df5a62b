//! Repository implementations for database operations.

pub mod activity;
pub mod artifacts;
pub mod repository;
pub mod token_grants;
pub mod trained_models;
pub mod users;

pub use artifacts::Artifacts;
pub use repository::Repository;
pub use token_grants::TokenGrants;
pub use trained_models::TrainedModels;
pub use users::Users;
