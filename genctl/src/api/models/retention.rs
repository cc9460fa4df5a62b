use crate::db::models::artifacts::PurgeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-table deleted row counts from a purge run
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedCount {
    pub generations: u64,
    pub images: u64,
}

/// Response body for the scheduled retention trigger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RetentionPurgeResponse {
    /// False when any table's delete failed
    pub success: bool,
    pub message: String,
    pub deleted_count: DeletedCount,
    /// Artifacts trashed before this instant were eligible
    pub cutoff_date: DateTime<Utc>,
}

impl From<&PurgeOutcome> for RetentionPurgeResponse {
    fn from(outcome: &PurgeOutcome) -> Self {
        let (generations, images) = outcome.counts();
        let message = if outcome.is_success() {
            format!("Purged {} generations and {} images", generations, images)
        } else {
            let mut failures = Vec::new();
            if outcome.generations.is_err() {
                failures.push("generations");
            }
            if outcome.images.is_err() {
                failures.push("images");
            }
            format!("Purge partially failed for: {}", failures.join(", "))
        };

        Self {
            success: outcome.is_success(),
            message,
            deleted_count: DeletedCount { generations, images },
            cutoff_date: outcome.cutoff,
        }
    }
}
