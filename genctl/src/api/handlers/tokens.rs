use crate::{
    AppState,
    api::{
        Json,
        models::{
            tokens::{ListGrantsQuery, TokenBalanceResponse, TokenGrantCreate, TokenGrantResponse},
            users::CurrentUser,
        },
    },
    auth::require_admin,
    db::{
        handlers::{TokenGrants, Users},
        models::token_grants::TokenGrantCreateDBRequest,
    },
    errors::{Error, Result},
    types::UserId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

/// Get current user's token balance
#[utoipa::path(
    get,
    path = "/users/current/tokens/balance",
    tag = "tokens",
    summary = "Get current user's token balance",
    description = "Sum of token quantities over the caller's unexpired grants",
    responses(
        (status = 200, description = "User's current balance", body = TokenBalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn get_current_user_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<TokenBalanceResponse>> {
    let now = Utc::now();
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TokenGrants::new(&mut pool_conn);

    let balance = repo.valid_balance(current_user.id, now).await?;

    Ok(Json(TokenBalanceResponse {
        user_id: current_user.id,
        balance,
        as_of: now,
    }))
}

/// List current user's token grants
#[utoipa::path(
    get,
    path = "/users/current/tokens/grants",
    tag = "tokens",
    summary = "List current user's token grants",
    description = "Grant history for the caller, newest first. Expired grants are included.",
    params(
        ListGrantsQuery
    ),
    responses(
        (status = 200, description = "List of grants", body = [TokenGrantResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn list_current_user_grants(
    State(state): State<AppState>,
    Query(query): Query<ListGrantsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<TokenGrantResponse>>> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    if skip < 0 || limit < 0 {
        return Err(Error::BadRequest {
            message: "skip and limit must be non-negative".to_string(),
        });
    }
    let limit = limit.min(1000);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TokenGrants::new(&mut pool_conn);

    let grants = repo.list_user_grants(current_user.id, skip, limit).await?;

    Ok(Json(grants.into_iter().map(TokenGrantResponse::from).collect()))
}

/// Get a specific user's token balance (admin only)
#[utoipa::path(
    get,
    path = "/users/{user_id}/tokens/balance",
    tag = "tokens",
    summary = "Get user's token balance",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)"),
    ),
    responses(
        (status = 200, description = "User's current balance", body = TokenBalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn get_user_balance(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: CurrentUser,
) -> Result<Json<TokenBalanceResponse>> {
    require_admin(&current_user, "read", "token balance")?;

    let now = Utc::now();
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = TokenGrants::new(&mut pool_conn);

    let balance = repo.valid_balance(user_id, now).await?;

    Ok(Json(TokenBalanceResponse {
        user_id,
        balance,
        as_of: now,
    }))
}

/// Record a token grant for a user (admin only)
#[utoipa::path(
    post,
    path = "/users/{user_id}/tokens/grants",
    tag = "tokens",
    summary = "Record a token grant",
    description = "Append a grant to the user's ledger. Grants are immutable once recorded.",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)"),
    ),
    responses(
        (status = 201, description = "Grant recorded", body = TokenGrantResponse),
        (status = 400, description = "Bad request - negative quantity or expiry in the past"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("X-Genctl-User" = [])
    )
)]
pub async fn add_user_grant(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: CurrentUser,
    Json(data): Json<TokenGrantCreate>,
) -> Result<(StatusCode, Json<TokenGrantResponse>)> {
    require_admin(&current_user, "create", "token grant")?;

    if data.token_quantity < 0 {
        return Err(Error::BadRequest {
            message: "token_quantity must be non-negative".to_string(),
        });
    }
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

    let mut repo = TokenGrants::new(&mut pool_conn);
    let grant = repo
        .record_grant(&TokenGrantCreateDBRequest {
            user_id,
            token_quantity: data.token_quantity,
            expires_at: data.expires_at,
            metadata: data.metadata,
        })
        .await?;

    crate::db::handlers::activity::record_activity(
        &state.db,
        Some(current_user.id),
        "tokens.grant",
        Some(user_id.to_string()),
        serde_json::json!({"token_quantity": grant.token_quantity, "expires_at": grant.expires_at}),
    )
    .await;

    Ok((StatusCode::CREATED, Json(TokenGrantResponse::from(grant))))
}
