//! # genctl: Control Plane for an AI Content-Generation Platform
//!
//! `genctl` is the entitlement and resource-lifecycle engine behind an AI content-generation
//! product. It answers three questions the rest of the platform keeps asking: how many tokens
//! does this user have left, which trained models is this user allowed to use, and when does
//! trashed content get permanently deleted.
//!
//! ## Overview
//!
//! The **token ledger** tracks consumable capacity as an append-only list of grants. Each grant
//! carries a quantity and an optional expiry; a user's balance is simply the sum of their
//! unexpired grants at the moment of the query. Nothing is ever mutated or reconciled, so the
//! history of how a balance came to be is always recoverable.
//!
//! The **entitlement resolver** decides model visibility. A trained model can be published to
//! everyone with a single flag, or assigned to individual users through per-user assignment rows
//! (optionally time-bound). The resolver unions both paths and never returns unpublished models.
//!
//! The **retention manager** implements trash semantics for generated content. Deleting a
//! generation or image marks it soft-deleted and stamps the deletion time; a scheduled purge,
//! triggered over HTTP by an external cron with a shared secret, permanently removes rows that
//! have sat in the trash beyond the retention window. Restoring an artifact clears the stamp and
//! restarts the clock.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence. The management API lives under `/admin/api/v1/*` and
//! authenticates callers via a trusted proxy header (for SSO integration); the retention trigger
//! lives at `/internal/retention/purge` behind a bearer secret. The database layer ([`db`]) uses
//! the repository pattern: each entity has a repository that borrows a connection and handles
//! queries and mutations, so callers control transaction boundaries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use genctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = genctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     genctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and automatically runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! genctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    db::{handlers::Users, models::users::UserCreateDBRequest},
    openapi::ApiDoc,
};
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ArtifactId, GrantId, ModelId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the genctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: if a user with the given email already exists it is left untouched and its id is
/// returned. Called during application startup so there's always an admin able to grant tokens
/// and manage model assignments.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, db: &PgPool) -> Result<UserId, sqlx::Error> {
    // Use a transaction to ensure atomicity
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo
        .get_by_email(email)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to check existing user: {e}")))?
    {
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let user_create = UserCreateDBRequest {
        username: email.to_string(),
        email: email.to_string(),
        display_name: None,
        is_admin: true,
    };

    let created_user = user_repo
        .create(&user_create)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to create admin user: {e}")))?;

    tx.commit().await?;
    info!("Created initial admin user {}", email);
    Ok(created_user.id)
}

/// Setup the database: connect (or adopt an existing pool), run migrations, seed the admin user
async fn setup_database(config: &Config, existing_pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    let pool = match existing_pool {
        Some(pool) => pool,
        None => {
            let settings = &config.database.pool;
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(std::time::Duration::from_secs(settings.acquire_timeout_secs))
                .connect(&config.database.url)
                .await?
        }
    };

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_email, &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Management API routes under `/admin/api/v1` (tokens, models, artifacts)
/// - The retention purge trigger at `/internal/retention/purge`
/// - Interactive API documentation at `/admin/docs`
/// - CORS and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    // API routes
    let api_routes = Router::new()
        // Token ledger
        .route("/users/current/tokens/balance", get(api::handlers::tokens::get_current_user_balance))
        .route("/users/current/tokens/grants", get(api::handlers::tokens::list_current_user_grants))
        .route("/users/{user_id}/tokens/balance", get(api::handlers::tokens::get_user_balance))
        .route("/users/{user_id}/tokens/grants", post(api::handlers::tokens::add_user_grant))
        // Trained models and entitlements
        .route("/models", get(api::handlers::entitlements::list_models))
        .route("/models", post(api::handlers::entitlements::create_model))
        .route("/models/{id}", patch(api::handlers::entitlements::update_model))
        .route("/models/{id}", delete(api::handlers::entitlements::delete_model))
        .route(
            "/models/{id}/assign-to-all",
            patch(api::handlers::entitlements::set_assign_to_all),
        )
        .route("/users/{user_id}/models", put(api::handlers::entitlements::put_user_assignments))
        .route("/users/{user_id}/models", get(api::handlers::entitlements::get_user_models))
        .route(
            "/users/{user_id}/models/{model_id}",
            put(api::handlers::entitlements::put_user_model_assignment),
        )
        // Generated content lifecycle
        .route("/generations", post(api::handlers::artifacts::create_generation))
        .route("/generations", get(api::handlers::artifacts::list_generations))
        .route("/generations/{id}/trash", post(api::handlers::artifacts::trash_generation))
        .route("/generations/{id}/restore", post(api::handlers::artifacts::restore_generation))
        .route("/images", post(api::handlers::artifacts::create_image))
        .route("/images", get(api::handlers::artifacts::list_images))
        .route("/images/{id}/trash", post(api::handlers::artifacts::trash_image))
        .route("/images/{id}/restore", post(api::handlers::artifacts::restore_image));

    let api_routes_with_state = api_routes.with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Scheduled trigger (external cron, not part of the client API)
        .route("/internal/retention/purge", get(api::handlers::retention::retention_purge))
        .with_state(state)
        .nest("/admin/api/v1", api_routes_with_state)
        .merge(Scalar::with_url("/admin/docs", ApiDoc::openapi()));

    // The API sits behind a trusted proxy; it does the origin policing
    let router = router.layer(CorsLayer::permissive());

    // Add tracing layer
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations,
///    and seeds the initial admin user
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, drains in-flight requests and
///    closes the connection pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application on an already-connected pool (used by tests)
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting genctl with configuration: {:#?}", config);

        let pool = setup_database(&config, pool).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state);

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("genctl listening on http://{}", bind_addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::create_initial_admin_user;
    use crate::db::handlers::Users;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_initial_admin_user_is_idempotent(pool: PgPool) {
        let first = create_initial_admin_user("admin@example.com", &pool).await.unwrap();
        let second = create_initial_admin_user("admin@example.com", &pool).await.unwrap();
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert!(user.is_admin);
        assert_eq!(user.email, "admin@example.com");
    }

    #[test_log::test(sqlx::test)]
    async fn test_healthz(pool: PgPool) {
        let server = crate::test_utils::create_test_app(pool).await;
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }
}
