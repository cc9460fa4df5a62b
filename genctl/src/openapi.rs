//! OpenAPI documentation for the management API.
//!
//! Served interactively at `/admin/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Security schemes: proxy-header identity for the management API, bearer
/// secret for the scheduled retention trigger.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "X-Genctl-User".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-genctl-user",
                    "User email set by a trusted upstream proxy (SSO integration). \
                     Requests without it are rejected.",
                ))),
            );
            components.security_schemes.insert(
                "CronSecret".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Shared secret for the retention trigger:\n\n\
                             ```\nAuthorization: Bearer CRON_SECRET\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/admin/api/v1", description = "Management API")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Token ledger
        api::handlers::tokens::get_current_user_balance,
        api::handlers::tokens::list_current_user_grants,
        api::handlers::tokens::get_user_balance,
        api::handlers::tokens::add_user_grant,
        // Trained models and entitlements
        api::handlers::entitlements::list_models,
        api::handlers::entitlements::create_model,
        api::handlers::entitlements::update_model,
        api::handlers::entitlements::delete_model,
        api::handlers::entitlements::set_assign_to_all,
        api::handlers::entitlements::put_user_assignments,
        api::handlers::entitlements::put_user_model_assignment,
        api::handlers::entitlements::get_user_models,
        // Generated content lifecycle
        api::handlers::artifacts::create_generation,
        api::handlers::artifacts::list_generations,
        api::handlers::artifacts::trash_generation,
        api::handlers::artifacts::restore_generation,
        api::handlers::artifacts::create_image,
        api::handlers::artifacts::list_images,
        api::handlers::artifacts::trash_image,
        api::handlers::artifacts::restore_image,
        // Scheduled trigger
        api::handlers::retention::retention_purge,
    ),
    components(
        schemas(
            api::models::tokens::TokenGrantCreate,
            api::models::tokens::TokenGrantResponse,
            api::models::tokens::TokenBalanceResponse,
            api::models::entitlements::TrainedModelCreate,
            api::models::entitlements::TrainedModelUpdate,
            api::models::entitlements::AssignToAllUpdate,
            api::models::entitlements::UserAssignmentsUpdate,
            api::models::entitlements::ModelAssignmentCreate,
            api::models::entitlements::ModelAssignmentResponse,
            api::models::entitlements::TrainedModelResponse,
            api::models::entitlements::UserAssignmentsResponse,
            api::models::artifacts::GenerationCreate,
            api::models::artifacts::GeneratedImageCreate,
            api::models::artifacts::GenerationResponse,
            api::models::artifacts::GeneratedImageResponse,
            api::models::retention::DeletedCount,
            api::models::retention::RetentionPurgeResponse,
            api::models::users::UserResponse,
            crate::db::models::trained_models::ModelType,
            crate::db::models::token_grants::GrantMetadata,
        )
    ),
    tags(
        (name = "tokens", description = "Token ledger: balances and grants"),
        (name = "models", description = "Trained models and user entitlements"),
        (name = "artifacts", description = "Generated content and trash lifecycle"),
        (name = "retention", description = "Scheduled retention purge"),
    ),
    info(
        title = "genctl Management API",
        description = "Entitlement and resource-lifecycle engine for an AI content-generation platform",
    )
)]
pub struct ApiDoc;
