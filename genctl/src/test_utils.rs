//! Test utilities for integration testing.

use crate::config::Config;
use crate::db::{
    handlers::Users,
    models::{
        trained_models::{ModelType, TrainedModel},
        users::{User, UserCreateDBRequest},
    },
};
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

/// The proxy auth header name used by the test config
pub fn auth_header() -> &'static str {
    "x-genctl-user"
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        cron_secret: Some("test-cron-secret".to_string()),
        ..Default::default()
    }
}

pub async fn create_test_user(pool: &PgPool, is_admin: bool) -> User {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let username = format!("testuser_{}", user_id.simple());
    let email = format!("{username}@example.com");

    let user_create = UserCreateDBRequest {
        username,
        email,
        display_name: Some("Test User".to_string()),
        is_admin,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}

pub async fn create_test_model(
    pool: &PgPool,
    name: &str,
    model_type: ModelType,
    is_published: bool,
    assign_to_all: bool,
) -> TrainedModel {
    sqlx::query_as::<_, TrainedModel>(
        r#"
        INSERT INTO trained_models (display_name, model_type, is_published, assign_to_all)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(model_type)
    .bind(is_published)
    .bind(assign_to_all)
    .fetch_one(pool)
    .await
    .expect("Failed to create test model")
}
