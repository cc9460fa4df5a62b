//! Common type definitions shared across the crate.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`UserId`]: User account identifier
//! - [`ModelId`]: Trained model identifier
//! - [`ArtifactId`]: Generation or generated-image identifier
//! - [`GrantId`]: Token grant identifier

use uuid::Uuid;

pub type UserId = Uuid;
pub type ModelId = Uuid;
pub type ArtifactId = Uuid;
pub type GrantId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
