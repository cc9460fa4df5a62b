//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Tokens** (`/admin/api/v1/users/*/tokens/*`): Token balance and grants
//! - **Models** (`/admin/api/v1/models/*`): Trained models and entitlements
//! - **Artifacts** (`/admin/api/v1/generations/*`, `/admin/api/v1/images/*`): Trash lifecycle
//! - **Retention** (`/internal/retention/purge`): Scheduled purge trigger
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/admin/docs` when the server is running.

pub mod handlers;
pub mod models;

use crate::errors::Error;
use axum::extract::{FromRequest, Request, rejection::JsonRejection};
use axum::response::{IntoResponse, Response};

/// JSON body extractor that routes malformed input through the error
/// taxonomy, so clients get the usual `{code, message}` body instead of
/// axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(Error::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
