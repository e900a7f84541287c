use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Login;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::RefreshToken;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::models::User;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::StorageError;

/// PostgreSQL implementation of IdentityRepository.
///
/// Uniqueness is enforced by table constraints, so concurrent writers race
/// inside the database rather than in this process.
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    login: String,
    password_hash: String,
    user_id: Uuid,
}

#[derive(FromRow)]
struct ProfileRow {
    user_id: Uuid,
    email: String,
}

#[derive(FromRow)]
struct RefreshTokenRow {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            login: Login::new(row.login)
                .map_err(|e| StorageError::Corrupt(format!("user {}: {}", row.id, e)))?,
            password_hash: row.password_hash,
            subject_id: SubjectId(row.user_id),
        })
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StorageError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            subject_id: SubjectId(row.user_id),
            email: EmailAddress::new(row.email)
                .map_err(|e| StorageError::Corrupt(format!("profile {}: {}", row.user_id, e)))?,
        })
    }
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            token: row.token,
            subject_id: SubjectId(row.user_id),
            expires_at: row.expires_at,
            revoked: row.revoked,
        }
    }
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `url`.
    ///
    /// # Errors
    /// * `Unavailable` - Database unreachable or URL invalid
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(unavailable)?;

        tracing::info!(max_connections, database = "postgresql", "Database connection pool created");
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!(database = "postgresql", "Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn unavailable(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

fn violated_constraint(e: &sqlx::Error) -> Option<String> {
    let db_err = e.as_database_error()?;
    if db_err.is_unique_violation() {
        Some(db_err.constraint().unwrap_or_default().to_string())
    } else {
        None
    }
}

fn refresh_token_insert_error(e: sqlx::Error) -> StorageError {
    match violated_constraint(&e) {
        Some(_) => StorageError::AlreadyExists("refresh token".to_string()),
        None => unavailable(e),
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (login, password_hash, user_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user.login.as_str())
        .bind(&user.password_hash)
        .bind(user.subject_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some("users_user_id_key") => {
                StorageError::AlreadyExists(format!("subject {}", user.subject_id))
            }
            Some(_) => StorageError::AlreadyExists(format!("login {}", user.login)),
            None => unavailable(e),
        })?;

        tracing::debug!(user_id = id, subject_id = %user.subject_id, "User inserted");

        Ok(User {
            id,
            login: user.login,
            password_hash: user.password_hash,
            subject_id: user.subject_id,
        })
    }

    async fn find_user_by_login(&self, login: &Login) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, password_hash, user_id
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(User::try_from).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET
                email = EXCLUDED.email,
                updated_at = NOW()
            "#,
        )
        .bind(profile.subject_id.as_uuid())
        .bind(profile.email.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn find_profile(&self, subject_id: &SubjectId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, email
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(subject_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(Profile::try_from).transpose()
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.subject_id.as_uuid())
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await
        .map_err(refresh_token_insert_error)?;

        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StorageError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token, user_id, expires_at, revoked
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(RefreshToken::from))
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("refresh token".to_string()));
        }

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        // Row lock taken here serializes concurrent rotations of one token.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token = $1 AND revoked = FALSE AND expires_at > $2
            "#,
        )
        .bind(presented)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await.map_err(unavailable)?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&replacement.token)
        .bind(replacement.subject_id.as_uuid())
        .bind(replacement.expires_at)
        .bind(replacement.revoked)
        .execute(&mut *tx)
        .await
        .map_err(refresh_token_insert_error)?;

        tx.commit().await.map_err(unavailable)?;
        Ok(true)
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        tracing::info!(database = "postgresql", "Database connection pool closed");
        Ok(())
    }
}
