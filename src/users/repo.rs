use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::users::repo_types::{NewUser, UserRecord};

/// Durable keyed storage for user records. Implementations enforce email uniqueness.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new: NewUser) -> AuthResult<UserRecord>;
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<UserRecord>>;
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;
    async fn find_by_reset_hash(&self, hash: &str) -> AuthResult<Option<UserRecord>>;
    /// Writes every mutable field of `user` back. `id` and `created_at` never change.
    async fn save(&self, user: &UserRecord) -> AuthResult<()>;
}

const USER_COLUMNS: &str = "id, name, email, password_secret, avatar, role, \
                            reset_proof_hash, reset_proof_expiry, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> AuthResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

fn map_unique_violation(e: sqlx::Error) -> AuthError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new: NewUser) -> AuthResult<UserRecord> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_secret, avatar, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_secret)
            .bind(&new.avatar)
            .bind(new.role)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique_violation)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("email", email).await
    }

    async fn find_by_reset_hash(&self, hash: &str) -> AuthResult<Option<UserRecord>> {
        self.find_one("reset_proof_hash", hash).await
    }

    async fn save(&self, user: &UserRecord) -> AuthResult<()> {
        let (reset_hash, reset_expiry) = match user.pending_reset() {
            Some((hash, expiry)) => (Some(hash), Some(expiry)),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE users
               SET name = $2,
                   email = $3,
                   password_secret = $4,
                   avatar = $5,
                   role = $6,
                   reset_proof_hash = $7,
                   reset_proof_expiry = $8
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_secret)
        .bind(&user.avatar)
        .bind(user.role)
        .bind(reset_hash)
        .bind(reset_expiry)
        .execute(&self.db)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }
}
