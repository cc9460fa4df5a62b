use crate::db::{
    errors::Result,
    models::token_grants::{GrantMetadata, TokenGrantCreateDBRequest},
};
use crate::types::{GrantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, types::Json};

// Database entity model for a token grant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
struct TokenGrant {
    pub id: GrantId,
    pub user_id: UserId,
    pub token_quantity: i64,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Json<GrantMetadata>,
    pub created_at: DateTime<Utc>,
}

/// Database response for a token grant
#[derive(Debug, Clone)]
pub struct TokenGrantDBResponse {
    pub id: GrantId,
    pub user_id: UserId,
    pub token_quantity: i64,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: GrantMetadata,
    pub created_at: DateTime<Utc>,
}

impl From<TokenGrant> for TokenGrantDBResponse {
    fn from(grant: TokenGrant) -> Self {
        Self {
            id: grant.id,
            user_id: grant.user_id,
            token_quantity: grant.token_quantity,
            granted_at: grant.granted_at,
            expires_at: grant.expires_at,
            metadata: grant.metadata.0,
            created_at: grant.created_at,
        }
    }
}

/// Ledger of time-bound token grants.
///
/// The ledger is append-only: grants are inserted on purchase or renewal and
/// never mutated or deleted. The usable balance at an instant is derived by
/// summing the grants still valid at that instant.
pub struct TokenGrants<'c> {
    db: &'c mut PgConnection,
}

impl<'c> TokenGrants<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Record a new grant (purchase, subscription renewal, or admin grant)
    pub async fn record_grant(&mut self, request: &TokenGrantCreateDBRequest) -> Result<TokenGrantDBResponse> {
        let grant = sqlx::query_as::<_, TokenGrant>(
            r#"
            INSERT INTO token_grants (user_id, token_quantity, expires_at, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.token_quantity)
        .bind(request.expires_at)
        .bind(Json(&request.metadata))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(TokenGrantDBResponse::from(grant))
    }

    /// Sum of token quantities over grants valid at `now`.
    ///
    /// A grant contributes exactly once, iff its expiry is unset or strictly
    /// in the future. `now` is injected by the caller so the computation is
    /// deterministic. Unknown users have no grants and get 0.
    pub async fn valid_balance(&mut self, user_id: UserId, now: DateTime<Utc>) -> Result<i64> {
        // SUM(bigint) widens to numeric in Postgres, so cast back down
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(token_quantity), 0)::BIGINT
            FROM token_grants
            WHERE user_id = $1
              AND (expires_at IS NULL OR expires_at > $2)
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// List grants for a user, newest first, with pagination
    pub async fn list_user_grants(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TokenGrantDBResponse>> {
        let grants = sqlx::query_as::<_, TokenGrant>(
            r#"
            SELECT *
            FROM token_grants
            WHERE user_id = $1
            ORDER BY granted_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(grants.into_iter().map(TokenGrantDBResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::token_grants::GrantSource;
    use crate::test_utils::create_test_user;
    use chrono::Duration;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn grant(pool: &PgPool, user_id: UserId, quantity: i64, expires_at: Option<DateTime<Utc>>) -> TokenGrantDBResponse {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        repo.record_grant(&TokenGrantCreateDBRequest {
            user_id,
            token_quantity: quantity,
            expires_at,
            metadata: GrantMetadata {
                source: Some(GrantSource::Purchase),
                ..Default::default()
            },
        })
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn test_balance_is_zero_without_grants(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);

        let balance = repo.valid_balance(user.id, Utc::now()).await.unwrap();
        assert_eq!(balance, 0);
    }

    #[sqlx::test]
    async fn test_balance_is_zero_for_unknown_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);

        // Nonexistent user is not an error, just an empty ledger
        let balance = repo.valid_balance(Uuid::new_v4(), Utc::now()).await.unwrap();
        assert_eq!(balance, 0);
    }

    #[sqlx::test]
    async fn test_expired_grants_contribute_nothing(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let now = Utc::now();

        // Grant A: 50 tokens, expires tomorrow. Grant B: 30 tokens, expired yesterday.
        grant(&pool, user.id, 50, Some(now + Duration::days(1))).await;
        grant(&pool, user.id, 30, Some(now - Duration::days(1))).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        assert_eq!(repo.valid_balance(user.id, now).await.unwrap(), 50);
    }

    #[sqlx::test]
    async fn test_never_expiring_grants_always_count(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let now = Utc::now();

        grant(&pool, user.id, 100, None).await;
        grant(&pool, user.id, 25, Some(now + Duration::hours(1))).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        assert_eq!(repo.valid_balance(user.id, now).await.unwrap(), 125);

        // Far in the future, only the never-expiring grant remains
        let later = now + Duration::days(365);
        assert_eq!(repo.valid_balance(user.id, later).await.unwrap(), 100);
    }

    #[sqlx::test]
    async fn test_adding_expired_grant_does_not_change_balance(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let now = Utc::now();

        grant(&pool, user.id, 40, None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        let before = repo.valid_balance(user.id, now).await.unwrap();
        drop(conn);

        grant(&pool, user.id, 999, Some(now - Duration::seconds(1))).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        assert_eq!(repo.valid_balance(user.id, now).await.unwrap(), before);
    }

    #[sqlx::test]
    async fn test_adding_valid_grant_increases_balance_by_quantity(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let now = Utc::now();

        grant(&pool, user.id, 40, None).await;
        grant(&pool, user.id, 7, Some(now + Duration::minutes(5))).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        assert_eq!(repo.valid_balance(user.id, now).await.unwrap(), 47);
    }

    #[sqlx::test]
    async fn test_balance_isolated_per_user(pool: PgPool) {
        let alice = create_test_user(&pool, false).await;
        let bob = create_test_user(&pool, false).await;
        let now = Utc::now();

        grant(&pool, alice.id, 10, None).await;
        grant(&pool, bob.id, 99, None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);
        assert_eq!(repo.valid_balance(alice.id, now).await.unwrap(), 10);
        assert_eq!(repo.valid_balance(bob.id, now).await.unwrap(), 99);
    }

    #[sqlx::test]
    async fn test_list_user_grants_keeps_expired_history(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let now = Utc::now();

        grant(&pool, user.id, 50, Some(now + Duration::days(1))).await;
        grant(&pool, user.id, 30, Some(now - Duration::days(1))).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);

        // Expired grants stay on the ledger for audit
        let grants = repo.list_user_grants(user.id, 0, 100).await.unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].metadata.source, Some(GrantSource::Purchase));
    }

    #[sqlx::test]
    async fn test_negative_quantity_rejected_by_check(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TokenGrants::new(&mut conn);

        let result = repo
            .record_grant(&TokenGrantCreateDBRequest {
                user_id: user.id,
                token_quantity: -5,
                expires_at: None,
                metadata: GrantMetadata::default(),
            })
            .await;

        assert!(matches!(result, Err(crate::db::errors::DbError::CheckViolation { .. })));
    }
}
