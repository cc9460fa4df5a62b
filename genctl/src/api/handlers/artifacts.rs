use crate::{
    AppState,
    api::{
        Json,
        models::{
            artifacts::{
                GeneratedImageCreate, GeneratedImageResponse, GenerationCreate, GenerationResponse, ListArtifactsQuery,
            },
            users::CurrentUser,
        },
    },
    db::{
        handlers::Artifacts,
        models::artifacts::{ArtifactKind, GeneratedImageCreateDBRequest, GenerationCreateDBRequest},
    },
    errors::{Error, Result},
    types::ArtifactId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

/// Record a generation
#[utoipa::path(
    post,
    path = "/generations",
    tag = "artifacts",
    summary = "Record a generation",
    responses(
        (status = 201, description = "Generation recorded", body = GenerationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn create_generation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<GenerationCreate>,
) -> Result<(StatusCode, Json<GenerationResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);

    let generation = repo
        .create_generation(&GenerationCreateDBRequest {
            owner_id: current_user.id,
            trained_model_id: data.trained_model_id,
            prompt: data.prompt,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(GenerationResponse::from(generation))))
}

/// List the caller's generations
#[utoipa::path(
    get,
    path = "/generations",
    tag = "artifacts",
    summary = "List generations",
    description = "The caller's generations, newest first. Pass `trashed=true` for the trash.",
    params(ListArtifactsQuery),
    responses(
        (status = 200, description = "List of generations", body = [GenerationResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn list_generations(
    State(state): State<AppState>,
    Query(query): Query<ListArtifactsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<GenerationResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);

    let generations = repo.list_generations(current_user.id, query.trashed).await?;

    Ok(Json(generations.into_iter().map(GenerationResponse::from).collect()))
}

/// Record a generated image
#[utoipa::path(
    post,
    path = "/images",
    tag = "artifacts",
    summary = "Record a generated image",
    responses(
        (status = 201, description = "Image recorded", body = GeneratedImageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn create_image(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<GeneratedImageCreate>,
) -> Result<(StatusCode, Json<GeneratedImageResponse>)> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);

    let image = repo
        .create_image(&GeneratedImageCreateDBRequest {
            owner_id: current_user.id,
            generation_id: data.generation_id,
            storage_url: data.storage_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(GeneratedImageResponse::from(image))))
}

/// List the caller's images
#[utoipa::path(
    get,
    path = "/images",
    tag = "artifacts",
    summary = "List generated images",
    params(ListArtifactsQuery),
    responses(
        (status = 200, description = "List of images", body = [GeneratedImageResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ListArtifactsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<GeneratedImageResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);

    let images = repo.list_images(current_user.id, query.trashed).await?;

    Ok(Json(images.into_iter().map(GeneratedImageResponse::from).collect()))
}

async fn trash_artifact(state: &AppState, user: &CurrentUser, kind: ArtifactKind, id: ArtifactId) -> Result<()> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);
    repo.soft_delete(kind, id, user.id, Utc::now()).await?;
    Ok(())
}

async fn restore_artifact(state: &AppState, user: &CurrentUser, kind: ArtifactKind, id: ArtifactId) -> Result<()> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Artifacts::new(&mut pool_conn);
    repo.restore(kind, id, user.id).await?;
    Ok(())
}

/// Move a generation to the trash
#[utoipa::path(
    post,
    path = "/generations/{id}/trash",
    tag = "artifacts",
    summary = "Trash a generation",
    description = "Starts the retention countdown. The row is permanently purged once it has been \
                   in the trash longer than the retention window.",
    params(("id" = String, Path, description = "Generation ID (UUID)")),
    responses(
        (status = 204, description = "Generation trashed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Generation not found or not owned by caller"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn trash_generation(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    trash_artifact(&state, &current_user, ArtifactKind::Generation, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bring a generation back from the trash
#[utoipa::path(
    post,
    path = "/generations/{id}/restore",
    tag = "artifacts",
    summary = "Restore a generation",
    params(("id" = String, Path, description = "Generation ID (UUID)")),
    responses(
        (status = 204, description = "Generation restored"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Generation not found or not owned by caller"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn restore_generation(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    restore_artifact(&state, &current_user, ArtifactKind::Generation, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an image to the trash
#[utoipa::path(
    post,
    path = "/images/{id}/trash",
    tag = "artifacts",
    summary = "Trash an image",
    params(("id" = String, Path, description = "Image ID (UUID)")),
    responses(
        (status = 204, description = "Image trashed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Image not found or not owned by caller"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn trash_image(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    trash_artifact(&state, &current_user, ArtifactKind::Image, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bring an image back from the trash
#[utoipa::path(
    post,
    path = "/images/{id}/restore",
    tag = "artifacts",
    summary = "Restore an image",
    params(("id" = String, Path, description = "Image ID (UUID)")),
    responses(
        (status = 204, description = "Image restored"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Image not found or not owned by caller"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn restore_image(
    State(state): State<AppState>,
    Path(id): Path<ArtifactId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    restore_artifact(&state, &current_user, ArtifactKind::Image, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
