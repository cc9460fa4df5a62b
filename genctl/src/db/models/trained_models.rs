//! Database models for trained models and their per-user assignments.

use crate::types::{ModelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of content a trained model produces, stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Photo,
    Video,
    Audio,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::Photo => write!(f, "photo"),
            ModelType::Video => write!(f, "video"),
            ModelType::Audio => write!(f, "audio"),
        }
    }
}

/// Trained model row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainedModel {
    pub id: ModelId,
    pub display_name: String,
    pub model_type: ModelType,
    pub group_id: Option<Uuid>,
    pub is_published: bool,
    pub assign_to_all: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Explicit per-user model grant row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelAssignment {
    pub trained_model_id: ModelId,
    pub user_id: UserId,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Database request for creating a trained model
#[derive(Debug, Clone)]
pub struct TrainedModelCreateDBRequest {
    pub display_name: String,
    pub model_type: ModelType,
    pub group_id: Option<Uuid>,
    pub is_published: bool,
}

/// Database request for updating a trained model.
///
/// `assign_to_all` is deliberately absent: toggling it has bulk side effects
/// on assignment rows and goes through its own operation.
#[derive(Debug, Clone, Default)]
pub struct TrainedModelUpdateDBRequest {
    pub display_name: Option<String>,
    pub is_published: Option<bool>,
}
