use async_trait::async_trait;
use chrono::{DateTime, Utc};
use talkie_shared::Message;
use uuid::Uuid;

use super::{DbPool, Registration, UserRecord, UserStore, VerifyOutcome};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_verified, verify_code, \
     verify_code_expiry, is_accepting_messages, created_at";

/// [`UserStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE username = $1
            ORDER BY is_verified DESC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_verified_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_verified"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, registration: Registration) -> Result<UserRecord, AppError> {
        let result = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, verify_code, verify_code_expiry)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&registration.username)
        .bind(&registration.email)
        .bind(&registration.password_hash)
        .bind(&registration.verify_code)
        .bind(registration.verify_code_expiry)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
                "Email is already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_pending_registration(
        &self,
        id: Uuid,
        registration: Registration,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = $1, password_hash = $2, verify_code = $3, verify_code_expiry = $4
            WHERE id = $5 AND NOT is_verified
            "#,
        )
        .bind(&registration.username)
        .bind(&registration.password_hash)
        .bind(&registration.verify_code)
        .bind(registration.verify_code_expiry)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_verify_code(
        &self,
        username: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE, verify_code = '', verify_code_expiry = to_timestamp(0)
            WHERE username = $1
              AND verify_code = $2
              AND NOT is_verified
              AND verify_code_expiry > $3
            "#,
        )
        .bind(username)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => return Ok(VerifyOutcome::Verified),
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(
                    "Username is already taken".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        }

        // The conditional update missed: either the code is stale or it expired.
        let pending: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM users WHERE username = $1 AND verify_code = $2 AND NOT is_verified LIMIT 1",
        )
        .bind(username)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(if pending.is_some() {
            VerifyOutcome::Expired
        } else {
            VerifyOutcome::NotFound
        })
    }

    async fn set_accepting_messages(
        &self,
        id: Uuid,
        accepting: bool,
    ) -> Result<Option<bool>, AppError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "UPDATE users SET is_accepting_messages = $1 WHERE id = $2 RETURNING is_accepting_messages",
        )
        .bind(accepting)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(flag,)| flag))
    }

    async fn push_message(&self, user_id: Uuid, message: &Message) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, user_id, content, created_at)
            SELECT $1, id, $3, $4 FROM users
            WHERE id = $2 AND is_accepting_messages
            "#,
        )
        .bind(message.id)
        .bind(user_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn pull_message(&self, user_id: Uuid, message_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1 AND user_id = $2")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, content, created_at
            FROM messages
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
