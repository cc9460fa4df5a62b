use crate::{
    AppState,
    api::{
        Json,
        models::{
            entitlements::{
                AssignToAllUpdate, ListModelsQuery, ModelAssignmentCreate, ModelAssignmentResponse,
                TrainedModelCreate, TrainedModelResponse, TrainedModelUpdate, UserAssignmentsResponse,
                UserAssignmentsUpdate,
            },
            users::CurrentUser,
        },
    },
    auth::require_admin,
    db::{
        handlers::{Repository, TrainedModels, Users, activity::record_activity, trained_models::TrainedModelFilter},
        models::trained_models::{TrainedModelCreateDBRequest, TrainedModelUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{ModelId, UserId},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for GET /models
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ModelsQuery {
    /// Restrict to one model type
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub model_type: Option<crate::db::models::trained_models::ModelType>,
    /// List every model regardless of entitlement (admin only)
    #[serde(default)]
    #[param(default = false)]
    pub all: bool,
}

/// List models visible to the caller
#[utoipa::path(
    get,
    path = "/models",
    tag = "models",
    summary = "List entitled models",
    description = "Published models the caller may use, via the assign-to-all flag or an unexpired \
                   assignment. Admins can pass `all=true` to list every model.",
    params(ModelsQuery),
    responses(
        (status = 200, description = "List of models", body = [TrainedModelResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - `all=true` requires admin"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<TrainedModelResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    let models = if query.all {
        require_admin(&current_user, "list", "all models")?;
        repo.list(&TrainedModelFilter {
            model_type: query.model_type,
            ..Default::default()
        })
        .await?
    } else {
        repo.list_entitled(current_user.id, query.model_type, Utc::now()).await?
    };

    Ok(Json(models.into_iter().map(TrainedModelResponse::from).collect()))
}

/// Create a trained model (admin only)
#[utoipa::path(
    post,
    path = "/models",
    tag = "models",
    summary = "Create a trained model",
    responses(
        (status = 201, description = "Model created", body = TrainedModelResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn create_model(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<TrainedModelCreate>,
) -> Result<(StatusCode, Json<TrainedModelResponse>)> {
    require_admin(&current_user, "create", "model")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    let model = repo
        .create(&TrainedModelCreateDBRequest {
            display_name: data.display_name,
            model_type: data.model_type,
            group_id: data.group_id,
            is_published: data.is_published,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TrainedModelResponse::from(model))))
}

/// Update a trained model's name or publication state (admin only)
#[utoipa::path(
    patch,
    path = "/models/{id}",
    tag = "models",
    summary = "Update a trained model",
    params(
        ("id" = String, Path, description = "Model ID (UUID)"),
    ),
    responses(
        (status = 200, description = "Updated model", body = TrainedModelResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    current_user: CurrentUser,
    Json(data): Json<TrainedModelUpdate>,
) -> Result<Json<TrainedModelResponse>> {
    require_admin(&current_user, "update", "model")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    if repo.get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Model".to_string(),
            id: id.to_string(),
        });
    }

    let model = repo
        .update(
            id,
            &TrainedModelUpdateDBRequest {
                display_name: data.display_name,
                is_published: data.is_published,
            },
        )
        .await?;

    Ok(Json(TrainedModelResponse::from(model)))
}

/// Delete a trained model (admin only)
#[utoipa::path(
    delete,
    path = "/models/{id}",
    tag = "models",
    summary = "Delete a trained model",
    params(
        ("id" = String, Path, description = "Model ID (UUID)"),
    ),
    responses(
        (status = 204, description = "Model deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn delete_model(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    require_admin(&current_user, "delete", "model")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    if !repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "Model".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the everyone-gets-this-model override (admin only)
#[utoipa::path(
    patch,
    path = "/models/{id}/assign-to-all",
    tag = "models",
    summary = "Set or clear assign-to-all",
    description = "Setting the flag also removes every explicit assignment row for the model. \
                   Clearing it only clears the flag; replaced assignments do not come back.",
    params(
        ("id" = String, Path, description = "Model ID (UUID)"),
    ),
    responses(
        (status = 200, description = "Updated model", body = TrainedModelResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn set_assign_to_all(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    current_user: CurrentUser,
    Json(data): Json<AssignToAllUpdate>,
) -> Result<Json<TrainedModelResponse>> {
    require_admin(&current_user, "update", "model assignment")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    let model = repo.set_assign_to_all(id, data.assign_to_all).await?;

    record_activity(
        &state.db,
        Some(current_user.id),
        "model.assign_to_all",
        Some(id.to_string()),
        serde_json::json!({"value": data.assign_to_all}),
    )
    .await;

    Ok(Json(TrainedModelResponse::from(model)))
}

/// Replace a user's explicit model assignments (admin only)
#[utoipa::path(
    put,
    path = "/users/{user_id}/models",
    tag = "models",
    summary = "Replace a user's model assignments",
    description = "Replaces the user's full explicit assignment set. Unknown model ids and models \
                   already assigned to everyone are ignored rather than rejected.",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)"),
    ),
    responses(
        (status = 200, description = "Assignment rows now in place", body = UserAssignmentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn put_user_assignments(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: CurrentUser,
    Json(data): Json<UserAssignmentsUpdate>,
) -> Result<Json<UserAssignmentsResponse>> {
    require_admin(&current_user, "update", "user assignments")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut pool_conn).get_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }

    let mut repo = TrainedModels::new(&mut pool_conn);
    repo.set_user_assignments(user_id, &data.model_ids).await?;
    let rows = repo.assignments_for_user(user_id).await?;

    record_activity(
        &state.db,
        Some(current_user.id),
        "user.set_assignments",
        Some(user_id.to_string()),
        serde_json::json!({"requested": data.model_ids.len(), "applied": rows.len()}),
    )
    .await;

    Ok(Json(UserAssignmentsResponse {
        model_ids: rows.into_iter().map(|a| a.trained_model_id).collect(),
    }))
}

/// Grant a single model to a user, optionally time-bound (admin only)
#[utoipa::path(
    put,
    path = "/users/{user_id}/models/{model_id}",
    tag = "models",
    summary = "Assign one model to a user",
    description = "Creates or replaces the assignment row for this user and model. An `expires_at` \
                   makes the assignment lapse at that instant; omitting it grants indefinitely. \
                   Models assigned to everyone cannot take explicit rows.",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)"),
        ("model_id" = String, Path, description = "Model ID (UUID)"),
    ),
    responses(
        (status = 200, description = "Assignment in place", body = ModelAssignmentResponse),
        (status = 400, description = "Expiry in the past, or the model is assigned to all users"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "User or model not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn put_user_model_assignment(
    State(state): State<AppState>,
    Path((user_id, model_id)): Path<(UserId, ModelId)>,
    current_user: CurrentUser,
    Json(data): Json<ModelAssignmentCreate>,
) -> Result<Json<ModelAssignmentResponse>> {
    require_admin(&current_user, "update", "user assignments")?;

    if let Some(expires_at) = data.expires_at
        && expires_at <= Utc::now()
    {
        return Err(Error::BadRequest {
            message: "expires_at must be in the future".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut pool_conn).get_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }

    let mut repo = TrainedModels::new(&mut pool_conn);
    let Some(model) = repo.get_by_id(model_id).await? else {
        return Err(Error::NotFound {
            resource: "Model".to_string(),
            id: model_id.to_string(),
        });
    };
    // The flag implies zero assignment rows; an explicit row would break that
    if model.assign_to_all {
        return Err(Error::BadRequest {
            message: "model is already assigned to all users".to_string(),
        });
    }

    let assignment = repo.upsert_assignment(model_id, user_id, data.expires_at).await?;

    record_activity(
        &state.db,
        Some(current_user.id),
        "user.assign_model",
        Some(user_id.to_string()),
        serde_json::json!({"model_id": model_id, "expires_at": assignment.expires_at}),
    )
    .await;

    Ok(Json(ModelAssignmentResponse::from(assignment)))
}

/// List a user's entitled models (admin only)
#[utoipa::path(
    get,
    path = "/users/{user_id}/models",
    tag = "models",
    summary = "List a user's entitled models",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)"),
        ListModelsQuery
    ),
    responses(
        (status = 200, description = "Entitled models", body = [TrainedModelResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn get_user_models(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ListModelsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<TrainedModelResponse>>> {
    require_admin(&current_user, "read", "user entitlements")?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TrainedModels::new(&mut pool_conn);

    let models = repo.list_entitled(user_id, query.model_type, Utc::now()).await?;

    Ok(Json(models.into_iter().map(TrainedModelResponse::from).collect()))
}
