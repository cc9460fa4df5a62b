use crate::db::handlers::token_grants::TokenGrantDBResponse;
use crate::db::models::token_grants::GrantMetadata;
use crate::types::{GrantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Request models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenGrantCreate {
    /// Number of tokens granted (must be non-negative)
    #[schema(minimum = 0)]
    pub token_quantity: i64,
    /// When the grant stops counting towards the balance (null = never)
    pub expires_at: Option<DateTime<Utc>>,
    /// Structured metadata attached by the billing integration
    #[serde(default)]
    pub metadata: GrantMetadata,
}

// Response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenGrantResponse {
    /// Grant ID
    #[schema(value_type = String, format = "uuid")]
    pub id: GrantId,
    /// User ID
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Number of tokens granted
    pub token_quantity: i64,
    /// When the grant was recorded
    pub granted_at: DateTime<Utc>,
    /// When the grant expires (null = never)
    pub expires_at: Option<DateTime<Utc>>,
    /// Grant metadata
    pub metadata: GrantMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenBalanceResponse {
    /// User ID
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Sum of token quantities over grants valid at `as_of`
    pub balance: i64,
    /// Instant the balance was computed at
    pub as_of: DateTime<Utc>,
}

/// Query parameters for listing grants
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListGrantsQuery {
    /// Number of items to skip
    #[param(default = 0, minimum = 0)]
    pub skip: Option<i64>,

    /// Maximum number of items to return
    #[param(default = 100, minimum = 1, maximum = 1000)]
    pub limit: Option<i64>,
}

// Conversions
impl From<TokenGrantDBResponse> for TokenGrantResponse {
    fn from(db: TokenGrantDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            token_quantity: db.token_quantity,
            granted_at: db.granted_at,
            expires_at: db.expires_at,
            metadata: db.metadata,
        }
    }
}
