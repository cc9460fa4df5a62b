//! Best-effort activity logging.
//!
//! The activity log is an audit convenience, not a correctness dependency:
//! a failed write is logged and swallowed so it can never fail the operation
//! being recorded.

use crate::types::UserId;
use sqlx::PgPool;
use tracing::warn;

/// Record an activity entry, swallowing any database error.
pub async fn record_activity(
    pool: &PgPool,
    actor_id: Option<UserId>,
    action: &str,
    subject: Option<String>,
    detail: serde_json::Value,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_log (actor_id, action, subject, detail)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(actor_id)
    .bind(action)
    .bind(subject)
    .bind(detail)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!("Failed to record activity '{action}': {e}");
    }
}
