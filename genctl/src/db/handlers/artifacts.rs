//! Trash lifecycle for generated artifacts.
//!
//! Artifacts are never hard-deleted by user action. Deleting moves the row to
//! the trash (`soft_deleted = TRUE` plus a timestamp), restoring moves it
//! back, and a scheduled purge permanently removes rows that have sat in the
//! trash beyond the retention window.

use crate::db::{
    errors::{DbError, Result},
    models::artifacts::{
        ArtifactKind, GeneratedImage, GeneratedImageCreateDBRequest, Generation, GenerationCreateDBRequest,
        PurgeOutcome,
    },
};
use crate::types::{ArtifactId, UserId};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};

/// How long a trashed artifact survives before it is eligible for purge.
pub const RETENTION_WINDOW_DAYS: i64 = 10;

pub struct Artifacts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Artifacts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create_generation(&mut self, request: &GenerationCreateDBRequest) -> Result<Generation> {
        let generation = sqlx::query_as::<_, Generation>(
            r#"
            INSERT INTO generations (owner_id, trained_model_id, prompt)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(request.trained_model_id)
        .bind(&request.prompt)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(generation)
    }

    pub async fn create_image(&mut self, request: &GeneratedImageCreateDBRequest) -> Result<GeneratedImage> {
        let image = sqlx::query_as::<_, GeneratedImage>(
            r#"
            INSERT INTO generated_images (owner_id, generation_id, storage_url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(request.generation_id)
        .bind(&request.storage_url)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(image)
    }

    /// Move an artifact to the trash.
    ///
    /// Stamps `soft_deleted_at` with the caller-supplied instant; the purge
    /// deadline is measured from that stamp. Already-trashed rows are
    /// restamped, which restarts their retention window. Scoped to the owner,
    /// so one user cannot trash another's artifacts.
    pub async fn soft_delete(
        &mut self,
        kind: ArtifactKind,
        id: ArtifactId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET soft_deleted = TRUE, soft_deleted_at = $3 WHERE id = $1 AND owner_id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql).bind(id).bind(owner_id).bind(now).execute(&mut *self.db).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Bring an artifact back from the trash, clearing the deletion stamp
    pub async fn restore(&mut self, kind: ArtifactKind, id: ArtifactId, owner_id: UserId) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET soft_deleted = FALSE, soft_deleted_at = NULL WHERE id = $1 AND owner_id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql).bind(id).bind(owner_id).execute(&mut *self.db).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn get_generation(&mut self, id: ArtifactId) -> Result<Option<Generation>> {
        let generation = sqlx::query_as::<_, Generation>("SELECT * FROM generations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(generation)
    }

    pub async fn get_image(&mut self, id: ArtifactId) -> Result<Option<GeneratedImage>> {
        let image = sqlx::query_as::<_, GeneratedImage>("SELECT * FROM generated_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(image)
    }

    /// List a user's generations, optionally restricted to the trash
    pub async fn list_generations(&mut self, owner_id: UserId, trashed: bool) -> Result<Vec<Generation>> {
        let generations = sqlx::query_as::<_, Generation>(
            r#"
            SELECT * FROM generations
            WHERE owner_id = $1 AND soft_deleted = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .bind(trashed)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(generations)
    }

    /// List a user's images, optionally restricted to the trash
    pub async fn list_images(&mut self, owner_id: UserId, trashed: bool) -> Result<Vec<GeneratedImage>> {
        let images = sqlx::query_as::<_, GeneratedImage>(
            r#"
            SELECT * FROM generated_images
            WHERE owner_id = $1 AND soft_deleted = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .bind(trashed)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(images)
    }
}

async fn purge_table(pool: &PgPool, kind: ArtifactKind, cutoff: DateTime<Utc>) -> Result<u64> {
    let sql = format!(
        r#"
        DELETE FROM {}
        WHERE soft_deleted = TRUE
          AND soft_deleted_at IS NOT NULL
          AND soft_deleted_at <= $1
        "#,
        kind.table()
    );
    let result = sqlx::query(&sql).bind(cutoff).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Permanently delete artifacts trashed before `now` minus the retention
/// window.
///
/// The two tables are purged as independent units of work: a failure on one
/// never rolls back or suppresses the count from the other, and the next run
/// picks up whatever this one missed. Rows with `soft_deleted_at` unset are
/// never eligible, whatever their flag says.
pub async fn purge_expired_trash(pool: &PgPool, now: DateTime<Utc>) -> PurgeOutcome {
    let cutoff = now - Duration::days(RETENTION_WINDOW_DAYS);

    let (generations, images) = tokio::join!(
        purge_table(pool, ArtifactKind::Generation, cutoff),
        purge_table(pool, ArtifactKind::Image, cutoff),
    );

    PurgeOutcome {
        generations,
        images,
        cutoff,
    }
}
