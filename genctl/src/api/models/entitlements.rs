use crate::db::models::trained_models::{ModelAssignment, ModelType, TrainedModel};
use crate::types::{ModelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Request models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrainedModelCreate {
    pub display_name: String,
    pub model_type: ModelType,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TrainedModelUpdate {
    pub display_name: Option<String>,
    pub is_published: Option<bool>,
}

/// Body for toggling the everyone-gets-this-model override
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignToAllUpdate {
    pub assign_to_all: bool,
}

/// Body for replacing a user's explicit model assignments
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserAssignmentsUpdate {
    /// The full replacement set. Unknown ids and models already assigned to
    /// everyone are ignored.
    #[schema(value_type = Vec<String>, format = "uuid")]
    pub model_ids: Vec<ModelId>,
}

/// Body for assigning a single model to a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ModelAssignmentCreate {
    /// When the assignment lapses (null = never)
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// Response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrainedModelResponse {
    /// Model ID
    #[schema(value_type = String, format = "uuid")]
    pub id: ModelId,
    pub display_name: String,
    pub model_type: ModelType,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub group_id: Option<Uuid>,
    pub is_published: bool,
    pub assign_to_all: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelAssignmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub trained_model_id: ModelId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserAssignmentsResponse {
    /// Model ids explicitly assigned to the user (excludes assign-to-all models)
    #[schema(value_type = Vec<String>, format = "uuid")]
    pub model_ids: Vec<ModelId>,
}

/// Query parameters for listing models
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListModelsQuery {
    /// Restrict to one model type
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub model_type: Option<ModelType>,
}

// Conversions
impl From<ModelAssignment> for ModelAssignmentResponse {
    fn from(assignment: ModelAssignment) -> Self {
        Self {
            trained_model_id: assignment.trained_model_id,
            user_id: assignment.user_id,
            assigned_at: assignment.assigned_at,
            expires_at: assignment.expires_at,
        }
    }
}

impl From<TrainedModel> for TrainedModelResponse {
    fn from(model: TrainedModel) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name,
            model_type: model.model_type,
            group_id: model.group_id,
            is_published: model.is_published,
            assign_to_all: model.assign_to_all,
            created_at: model.created_at,
        }
    }
}
