use crate::db::{
    errors::Result,
    models::users::{User, UserCreateDBRequest},
};
use crate::types::UserId;
use sqlx::PgConnection;

/// Repository for user accounts.
///
/// Users are created on first sight of a proxy-auth header or by the
/// bootstrap admin path, then mostly read.
pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, display_name, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.is_admin)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::PgPool;

    fn request(email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            display_name: None,
            is_admin: false,
        }
    }

    #[sqlx::test]
    async fn test_create_and_fetch(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&request("maria@example.com")).await.unwrap();
        assert_eq!(created.username, "maria");
        assert!(!created.is_admin);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "maria@example.com");

        let by_email = repo.get_by_email("maria@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[sqlx::test]
    async fn test_duplicate_email_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&request("dup@example.com")).await.unwrap();
        let result = repo.create(&request("dup@example.com")).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }
}
