use crate::db::models::artifacts::{GeneratedImage, Generation};
use crate::types::{ArtifactId, ModelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Request models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub trained_model_id: Option<ModelId>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedImageCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub generation_id: Option<ArtifactId>,
    pub storage_url: Option<String>,
}

// Response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArtifactId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub trained_model_id: Option<ModelId>,
    pub prompt: Option<String>,
    pub soft_deleted: bool,
    pub soft_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedImageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArtifactId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub generation_id: Option<ArtifactId>,
    pub storage_url: Option<String>,
    pub soft_deleted: bool,
    pub soft_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing artifacts
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListArtifactsQuery {
    /// List trashed artifacts instead of live ones
    #[serde(default)]
    #[param(default = false)]
    pub trashed: bool,
}

// Conversions
impl From<Generation> for GenerationResponse {
    fn from(g: Generation) -> Self {
        Self {
            id: g.id,
            owner_id: g.owner_id,
            trained_model_id: g.trained_model_id,
            prompt: g.prompt,
            soft_deleted: g.soft_deleted,
            soft_deleted_at: g.soft_deleted_at,
            created_at: g.created_at,
        }
    }
}

impl From<GeneratedImage> for GeneratedImageResponse {
    fn from(img: GeneratedImage) -> Self {
        Self {
            id: img.id,
            owner_id: img.owner_id,
            generation_id: img.generation_id,
            storage_url: img.storage_url,
            soft_deleted: img.soft_deleted,
            soft_deleted_at: img.soft_deleted_at,
            created_at: img.created_at,
        }
    }
}
