//! Scheduled retention trigger.
//!
//! The purge has exactly one network surface: an internal endpoint called by
//! an external cron scheduler, authenticated with a shared secret from config.

use crate::{
    AppState,
    api::models::retention::RetentionPurgeResponse,
    db::handlers::{activity::record_activity, artifacts::purge_expired_trash},
    errors::{Error, Result},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Json,
};
use chrono::Utc;
use tracing::{info, instrument};

fn check_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = state.config.cron_secret.as_deref() else {
        return Err(Error::Internal {
            operation: "run retention purge: cron_secret is not configured".to_string(),
        });
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match provided {
        Some(secret) if secret == expected => Ok(()),
        _ => Err(Error::Unauthenticated {
            message: Some("Invalid or missing retention secret".to_string()),
        }),
    }
}

/// Purge artifacts that have been in the trash beyond the retention window
#[utoipa::path(
    get,
    path = "/internal/retention/purge",
    tag = "retention",
    summary = "Run the retention purge",
    description = "Permanently deletes generations and images trashed more than 10 days ago. \
                   Intended to be called by a cron scheduler with the shared secret.",
    responses(
        (status = 200, description = "Purge completed", body = RetentionPurgeResponse),
        (status = 401, description = "Invalid or missing secret"),
        (status = 500, description = "Secret unconfigured, or one of the deletes failed", body = RetentionPurgeResponse),
    ),
    security(
        ("CronSecret" = [])
    )
)]
#[instrument(skip(state, headers))]
pub async fn retention_purge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<RetentionPurgeResponse>)> {
    check_cron_secret(&state, &headers)?;

    let outcome = purge_expired_trash(&state.db, Utc::now()).await;
    let response = RetentionPurgeResponse::from(&outcome);

    info!(
        generations = response.deleted_count.generations,
        images = response.deleted_count.images,
        success = response.success,
        "Retention purge run"
    );

    record_activity(
        &state.db,
        None,
        "retention.purge",
        None,
        serde_json::json!({
            "generations": response.deleted_count.generations,
            "images": response.deleted_count.images,
            "success": response.success,
        }),
    )
    .await;

    // Partial failure still reports whatever was deleted
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((status, Json(response)))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{auth_header, create_test_app, create_test_app_with_config, create_test_config, create_test_user};
    use serde_json::json;
    use sqlx::PgPool;

    #[test_log::test(sqlx::test)]
    async fn test_purge_requires_matching_secret(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server.get("/internal/retention/purge").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let response = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer wrong-secret")
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(sqlx::test)]
    async fn test_purge_fails_closed_without_configured_secret(pool: PgPool) {
        let mut config = create_test_config();
        config.cron_secret = None;
        let server = create_test_app_with_config(pool.clone(), config).await;

        let response = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer anything")
            .await;
        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test_log::test(sqlx::test)]
    async fn test_purge_deletes_expired_trash_only(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;

        // Expired trash, fresh trash, and a live row
        sqlx::query(
            r#"
            INSERT INTO generations (owner_id, prompt, soft_deleted, soft_deleted_at)
            VALUES
                ($1, 'old', TRUE, NOW() - INTERVAL '11 days'),
                ($1, 'recent', TRUE, NOW() - INTERVAL '9 days'),
                ($1, 'live', FALSE, NULL)
            "#,
        )
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO generated_images (owner_id, soft_deleted, soft_deleted_at) VALUES ($1, TRUE, NOW() - INTERVAL '12 days')",
        )
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

        let response = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer test-cron-secret")
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["deleted_count"], json!({"generations": 1, "images": 1}));
        assert!(body["cutoff_date"].is_string());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 2);
    }

    #[test_log::test(sqlx::test)]
    async fn test_purge_half_failure_is_500_with_partial_counts(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;

        sqlx::query(
            "INSERT INTO generated_images (owner_id, soft_deleted, soft_deleted_at) VALUES ($1, TRUE, NOW() - INTERVAL '12 days')",
        )
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

        // Break the generations half; the images half must still run and report
        sqlx::query("DROP TABLE generations CASCADE").execute(&pool).await.unwrap();

        let response = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer test-cron-secret")
            .await;
        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["deleted_count"], json!({"generations": 0, "images": 1}));
        assert!(body["message"].as_str().unwrap().contains("generations"));
    }

    #[test_log::test(sqlx::test)]
    async fn test_purge_is_idempotent_over_runs(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;

        sqlx::query(
            "INSERT INTO generations (owner_id, soft_deleted, soft_deleted_at) VALUES ($1, TRUE, NOW() - INTERVAL '20 days')",
        )
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

        let first: serde_json::Value = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer test-cron-secret")
            .await
            .json();
        assert_eq!(first["deleted_count"]["generations"], 1);

        let second: serde_json::Value = server
            .get("/internal/retention/purge")
            .add_header("authorization", "Bearer test-cron-secret")
            .await
            .json();
        assert_eq!(second["deleted_count"]["generations"], 0);
        assert_eq!(second["success"], true);
    }

    // The proxy auth header plays no part here, with or without admin
    #[test_log::test(sqlx::test)]
    async fn test_user_header_does_not_substitute_for_secret(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;

        let response = server
            .get("/internal/retention/purge")
            .add_header(auth_header(), admin.email.clone())
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }
}
