//! Database models for the token grant ledger.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Where a grant came from, stored as part of the grant metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    Purchase,
    SubscriptionRenewal,
    AdminGrant,
}

/// Structured grant metadata.
///
/// Known fields are typed; anything else a billing integration attaches rides
/// along in `extra` so old rows deserialize cleanly after the schema grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GrantMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<GrantSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Database request for recording a new token grant
#[derive(Debug, Clone)]
pub struct TokenGrantCreateDBRequest {
    pub user_id: UserId,
    pub token_quantity: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: GrantMetadata,
}
