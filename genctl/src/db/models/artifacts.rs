//! Database models for generated artifacts (generations and generated images).

use crate::db::errors::DbError;
use crate::types::{ArtifactId, ModelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The two artifact kinds that share the trash/purge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Generation,
    Image,
}

impl ArtifactKind {
    /// The table backing this artifact kind. Static, never interpolated from input.
    pub fn table(&self) -> &'static str {
        match self {
            ArtifactKind::Generation => "generations",
            ArtifactKind::Image => "generated_images",
        }
    }
}

/// Generation record row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Generation {
    pub id: ArtifactId,
    pub owner_id: UserId,
    pub trained_model_id: Option<ModelId>,
    pub prompt: Option<String>,
    pub soft_deleted: bool,
    pub soft_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Generated image row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneratedImage {
    pub id: ArtifactId,
    pub owner_id: UserId,
    pub generation_id: Option<ArtifactId>,
    pub storage_url: Option<String>,
    pub soft_deleted: bool,
    pub soft_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database request for creating a generation record
#[derive(Debug, Clone)]
pub struct GenerationCreateDBRequest {
    pub owner_id: UserId,
    pub trained_model_id: Option<ModelId>,
    pub prompt: Option<String>,
}

/// Database request for creating a generated-image record
#[derive(Debug, Clone)]
pub struct GeneratedImageCreateDBRequest {
    pub owner_id: UserId,
    pub generation_id: Option<ArtifactId>,
    pub storage_url: Option<String>,
}

/// Result of a purge run.
///
/// The two deletes are independent units of work: one failing must not
/// discard the count the other already produced, so each half carries its
/// own `Result` instead of the whole outcome collapsing to a single error.
#[derive(Debug)]
pub struct PurgeOutcome {
    pub generations: Result<u64, DbError>,
    pub images: Result<u64, DbError>,
    pub cutoff: DateTime<Utc>,
}

impl PurgeOutcome {
    pub fn is_success(&self) -> bool {
        self.generations.is_ok() && self.images.is_ok()
    }

    /// Deleted row counts, with 0 standing in for a failed half.
    pub fn counts(&self) -> (u64, u64) {
        (
            *self.generations.as_ref().unwrap_or(&0),
            *self.images.as_ref().unwrap_or(&0),
        )
    }
}
