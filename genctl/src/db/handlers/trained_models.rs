use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::trained_models::{
        ModelAssignment, ModelType, TrainedModel, TrainedModelCreateDBRequest, TrainedModelUpdateDBRequest,
    },
};
use crate::types::{ModelId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;

/// Filter for listing trained models (admin view)
#[derive(Debug, Clone)]
pub struct TrainedModelFilter {
    pub model_type: Option<ModelType>,
    pub published_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl Default for TrainedModelFilter {
    fn default() -> Self {
        Self {
            model_type: None,
            published_only: false,
            skip: 0,
            limit: 1000,
        }
    }
}

/// Repository for trained models and the entitlement rules over them.
///
/// Entitlement is computed, never stored: a user may use a model iff it is
/// published and either carries the `assign_to_all` override or has an
/// unexpired assignment row for that user.
pub struct TrainedModels<'c> {
    db: &'c mut PgConnection,
}

impl<'c> TrainedModels<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The effective set of models `user_id` may use at `now`.
    ///
    /// A model satisfying both the override and an explicit assignment still
    /// appears exactly once: the assignment clause is an EXISTS probe, not a
    /// join, so there is no row fan-out to deduplicate. Ordered by display
    /// name for stable presentation.
    pub async fn list_entitled(
        &mut self,
        user_id: UserId,
        type_filter: Option<ModelType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrainedModel>> {
        let mut query = sqlx::QueryBuilder::new(
            r#"
            SELECT m.* FROM trained_models m
            WHERE m.is_published
              AND (m.assign_to_all OR EXISTS (
                  SELECT 1 FROM model_assignments a
                  WHERE a.trained_model_id = m.id
                    AND a.user_id = "#,
        );
        query.push_bind(user_id);
        query.push(" AND (a.expires_at IS NULL OR a.expires_at > ");
        query.push_bind(now);
        query.push(")))");

        if let Some(model_type) = type_filter {
            query.push(" AND m.model_type = ");
            query.push_bind(model_type);
        }

        query.push(" ORDER BY m.display_name, m.id");

        let models = query.build_query_as::<TrainedModel>().fetch_all(&mut *self.db).await?;
        Ok(models)
    }

    /// Set or clear the everyone-gets-this-model override.
    ///
    /// Setting the flag deletes every explicit assignment row for the model
    /// in the same transaction: the flag implies zero assignment rows, and a
    /// reader must never observe the flag without the deletion. Clearing the
    /// flag touches nothing else, so previously replaced assignments do not
    /// reappear.
    pub async fn set_assign_to_all(&mut self, model_id: ModelId, value: bool) -> Result<TrainedModel> {
        let mut tx = self.db.begin().await?;

        let model = sqlx::query_as::<_, TrainedModel>(
            r#"
            UPDATE trained_models
            SET assign_to_all = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(model_id)
        .bind(value)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if value {
            sqlx::query("DELETE FROM model_assignments WHERE trained_model_id = $1")
                .bind(model_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(model)
    }

    /// Replace the full explicit-assignment set for a user.
    ///
    /// Delete-then-insert in one transaction, so the operation is idempotent
    /// and concurrent calls resolve to last-write-wins on the whole set.
    /// Unknown model ids and models with `assign_to_all = true` are filtered
    /// by the insert's SELECT rather than rejected.
    pub async fn set_user_assignments(&mut self, user_id: UserId, model_ids: &[ModelId]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM model_assignments WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO model_assignments (trained_model_id, user_id)
            SELECT m.id, $1
            FROM trained_models m
            WHERE m.id = ANY($2)
              AND m.assign_to_all = FALSE
            "#,
        )
        .bind(user_id)
        .bind(model_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Grant a single model to a user, replacing any existing assignment row
    pub async fn upsert_assignment(
        &mut self,
        model_id: ModelId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ModelAssignment> {
        let assignment = sqlx::query_as::<_, ModelAssignment>(
            r#"
            INSERT INTO model_assignments (trained_model_id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (trained_model_id, user_id)
            DO UPDATE SET assigned_at = NOW(), expires_at = EXCLUDED.expires_at
            RETURNING *
            "#,
        )
        .bind(model_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(assignment)
    }

    /// All explicit assignment rows for a model
    pub async fn assignments_for_model(&mut self, model_id: ModelId) -> Result<Vec<ModelAssignment>> {
        let assignments = sqlx::query_as::<_, ModelAssignment>(
            "SELECT * FROM model_assignments WHERE trained_model_id = $1 ORDER BY assigned_at",
        )
        .bind(model_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(assignments)
    }

    /// All explicit assignment rows for a user
    pub async fn assignments_for_user(&mut self, user_id: UserId) -> Result<Vec<ModelAssignment>> {
        let assignments = sqlx::query_as::<_, ModelAssignment>(
            "SELECT * FROM model_assignments WHERE user_id = $1 ORDER BY trained_model_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(assignments)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for TrainedModels<'c> {
    type CreateRequest = TrainedModelCreateDBRequest;
    type UpdateRequest = TrainedModelUpdateDBRequest;
    type Response = TrainedModel;
    type Id = ModelId;
    type Filter = TrainedModelFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let model = sqlx::query_as::<_, TrainedModel>(
            r#"
            INSERT INTO trained_models (display_name, model_type, group_id, is_published)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.display_name)
        .bind(request.model_type)
        .bind(request.group_id)
        .bind(request.is_published)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(model)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let model = sqlx::query_as::<_, TrainedModel>("SELECT * FROM trained_models WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(model)
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let models = sqlx::query_as::<_, TrainedModel>("SELECT * FROM trained_models WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(models.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM trained_models WHERE 1=1");

        if let Some(model_type) = filter.model_type {
            query.push(" AND model_type = ");
            query.push_bind(model_type);
        }

        if filter.published_only {
            query.push(" AND is_published = TRUE");
        }

        query.push(" ORDER BY display_name, id OFFSET ");
        query.push_bind(filter.skip);
        query.push(" LIMIT ");
        query.push_bind(filter.limit);

        let models = query.build_query_as::<TrainedModel>().fetch_all(&mut *self.db).await?;
        Ok(models)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Assignment rows go with the model via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM trained_models WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let model = sqlx::query_as::<_, TrainedModel>(
            r#"
            UPDATE trained_models
            SET
                display_name = COALESCE($2, display_name),
                is_published = COALESCE($3, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.display_name)
        .bind(request.is_published)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_model, create_test_user};
    use chrono::Duration;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    async fn test_assign_to_all_entitles_every_user(pool: PgPool) {
        let alice = create_test_user(&pool, false).await;
        let bob = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "shared", ModelType::Photo, true, true).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        let now = Utc::now();

        for user in [alice.id, bob.id] {
            let entitled = repo.list_entitled(user, None, now).await.unwrap();
            assert_eq!(entitled.len(), 1);
            assert_eq!(entitled[0].id, model.id);
        }
    }

    #[sqlx::test]
    async fn test_unpublished_models_never_entitled(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "draft", ModelType::Photo, false, true).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        repo.upsert_assignment(model.id, user.id, None).await.unwrap();

        // Unpublished dominates both the override and the explicit assignment
        let entitled = repo.list_entitled(user.id, None, Utc::now()).await.unwrap();
        assert!(entitled.is_empty());
    }

    #[sqlx::test]
    async fn test_explicit_assignment_entitles_only_that_user(pool: PgPool) {
        let alice = create_test_user(&pool, false).await;
        let bob = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "private", ModelType::Video, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        repo.upsert_assignment(model.id, alice.id, None).await.unwrap();

        let now = Utc::now();
        assert_eq!(repo.list_entitled(alice.id, None, now).await.unwrap().len(), 1);
        assert!(repo.list_entitled(bob.id, None, now).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_expired_assignment_not_entitled(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "lapsed", ModelType::Photo, true, false).await;

        let now = Utc::now();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        repo.upsert_assignment(model.id, user.id, Some(now - Duration::hours(1)))
            .await
            .unwrap();

        assert!(repo.list_entitled(user.id, None, now).await.unwrap().is_empty());

        // But it was entitled before the expiry instant
        let earlier = now - Duration::hours(2);
        assert_eq!(repo.list_entitled(user.id, None, earlier).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    async fn test_entitled_appears_once_with_both_clauses(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "both", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        repo.upsert_assignment(model.id, user.id, None).await.unwrap();

        // Flip the override on while the assignment row is still present
        // (bypassing set_assign_to_all's cleanup) to force both clauses true
        sqlx::query("UPDATE trained_models SET assign_to_all = TRUE WHERE id = $1")
            .bind(model.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let mut repo = TrainedModels::new(&mut conn);
        let entitled = repo.list_entitled(user.id, None, Utc::now()).await.unwrap();
        assert_eq!(entitled.len(), 1);
    }

    #[sqlx::test]
    async fn test_type_filter_and_name_ordering(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        create_test_model(&pool, "zeta", ModelType::Photo, true, true).await;
        create_test_model(&pool, "alpha", ModelType::Photo, true, true).await;
        create_test_model(&pool, "voice", ModelType::Audio, true, true).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        let now = Utc::now();

        let photos = repo.list_entitled(user.id, Some(ModelType::Photo), now).await.unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].display_name, "alpha");
        assert_eq!(photos[1].display_name, "zeta");

        let all = repo.list_entitled(user.id, None, now).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[sqlx::test]
    async fn test_set_assign_to_all_true_deletes_assignment_rows(pool: PgPool) {
        let alice = create_test_user(&pool, false).await;
        let bob = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "promoted", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);
        repo.upsert_assignment(model.id, alice.id, None).await.unwrap();
        repo.upsert_assignment(model.id, bob.id, None).await.unwrap();

        let updated = repo.set_assign_to_all(model.id, true).await.unwrap();
        assert!(updated.assign_to_all);

        assert!(repo.assignments_for_model(model.id).await.unwrap().is_empty());

        // Everyone stays entitled through the override
        assert_eq!(repo.list_entitled(alice.id, None, Utc::now()).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    async fn test_set_assign_to_all_false_only_clears_flag(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "demoted", ModelType::Photo, true, true).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        let updated = repo.set_assign_to_all(model.id, false).await.unwrap();
        assert!(!updated.assign_to_all);

        // No assignment rows were conjured up, so nobody is entitled anymore
        assert!(repo.list_entitled(user.id, None, Utc::now()).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_set_assign_to_all_unknown_model_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        let result = repo.set_assign_to_all(Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    async fn test_set_user_assignments_replaces_full_set(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let m1 = create_test_model(&pool, "one", ModelType::Photo, true, false).await;
        let m2 = create_test_model(&pool, "two", ModelType::Photo, true, false).await;
        let m3 = create_test_model(&pool, "three", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        repo.set_user_assignments(user.id, &[m1.id, m2.id]).await.unwrap();
        let now = Utc::now();
        let entitled: Vec<_> = repo.list_entitled(user.id, None, now).await.unwrap();
        assert_eq!(entitled.len(), 2);

        // Replacement, not merge
        repo.set_user_assignments(user.id, &[m3.id]).await.unwrap();
        let entitled = repo.list_entitled(user.id, None, now).await.unwrap();
        assert_eq!(entitled.len(), 1);
        assert_eq!(entitled[0].id, m3.id);
    }

    #[sqlx::test]
    async fn test_set_user_assignments_idempotent(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let m1 = create_test_model(&pool, "one", ModelType::Photo, true, false).await;
        let m2 = create_test_model(&pool, "two", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        repo.set_user_assignments(user.id, &[m1.id, m2.id]).await.unwrap();
        repo.set_user_assignments(user.id, &[m1.id, m2.id]).await.unwrap();

        // No duplicate rows, same entitlement result
        assert_eq!(repo.assignments_for_user(user.id).await.unwrap().len(), 2);
        assert_eq!(repo.list_entitled(user.id, None, Utc::now()).await.unwrap().len(), 2);
    }

    #[sqlx::test]
    async fn test_set_user_assignments_filters_assign_to_all_models(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let global = create_test_model(&pool, "global", ModelType::Photo, true, true).await;
        let private = create_test_model(&pool, "private", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        repo.set_user_assignments(user.id, &[global.id, private.id]).await.unwrap();

        // No row was created for the assign_to_all model...
        let rows = repo.assignments_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trained_model_id, private.id);

        // ...but it is still entitled through the override
        let entitled = repo.list_entitled(user.id, None, Utc::now()).await.unwrap();
        assert_eq!(entitled.len(), 2);
    }

    #[sqlx::test]
    async fn test_set_user_assignments_drops_unknown_ids(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "real", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        // Unknown id does not fail the whole call
        repo.set_user_assignments(user.id, &[model.id, Uuid::new_v4()]).await.unwrap();

        let rows = repo.assignments_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trained_model_id, model.id);
    }

    #[sqlx::test]
    async fn test_set_user_assignments_empty_set_revokes_all(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "revoked", ModelType::Photo, true, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        repo.set_user_assignments(user.id, &[model.id]).await.unwrap();
        repo.set_user_assignments(user.id, &[]).await.unwrap();

        assert!(repo.assignments_for_user(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_reassignment_replaces_instead_of_duplicating(pool: PgPool) {
        let user = create_test_user(&pool, false).await;
        let model = create_test_model(&pool, "again", ModelType::Photo, true, false).await;

        let now = Utc::now();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        repo.upsert_assignment(model.id, user.id, Some(now - Duration::hours(1)))
            .await
            .unwrap();
        repo.upsert_assignment(model.id, user.id, None).await.unwrap();

        let rows = repo.assignments_for_model(model.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expires_at, None);
    }

    #[sqlx::test]
    async fn test_crud_update_and_delete(pool: PgPool) {
        let model = create_test_model(&pool, "old-name", ModelType::Audio, false, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TrainedModels::new(&mut conn);

        let updated = repo
            .update(
                model.id,
                &TrainedModelUpdateDBRequest {
                    display_name: Some("new-name".to_string()),
                    is_published: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name, "new-name");
        assert!(updated.is_published);

        assert!(repo.delete(model.id).await.unwrap());
        assert!(repo.get_by_id(model.id).await.unwrap().is_none());
        assert!(!repo.delete(model.id).await.unwrap());
    }
}
