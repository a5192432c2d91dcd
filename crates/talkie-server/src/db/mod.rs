use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use talkie_shared::{Message, SessionUser};
use uuid::Uuid;

use crate::error::AppError;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DbPool = PgPool;

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Full account row, including credential and verification state.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verify_code: String,
    pub verify_code_expiry: DateTime<Utc>,
    pub is_accepting_messages: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            username: self.username.clone(),
            is_verified: self.is_verified,
            is_accepting_messages: self.is_accepting_messages,
        }
    }
}

/// Fields written when an account is created or a pending sign-up is repeated.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Expired,
    NotFound,
}

/// Persistence boundary for accounts and their messages.
///
/// Every mutating method is a single atomic operation against the backing
/// store so concurrent requests cannot lose updates.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Any account holding `username`, verified accounts first.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    async fn find_verified_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, AppError>;

    /// Fails with [`AppError::Conflict`] when the email is already registered.
    async fn create_user(&self, registration: Registration) -> Result<UserRecord, AppError>;

    /// Overwrites username, password hash and verification code of an
    /// unverified account. Verified accounts are left untouched.
    async fn update_pending_registration(
        &self,
        id: Uuid,
        registration: Registration,
    ) -> Result<(), AppError>;

    /// Marks the account verified if `code` matches and has not expired at
    /// `now`, clearing the code in the same step.
    async fn consume_verify_code(
        &self,
        username: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, AppError>;

    /// Returns the persisted flag, or `None` if the account does not exist.
    async fn set_accepting_messages(
        &self,
        id: Uuid,
        accepting: bool,
    ) -> Result<Option<bool>, AppError>;

    /// Appends `message` only while the recipient accepts messages.
    /// Returns `false` when nothing was stored.
    async fn push_message(&self, user_id: Uuid, message: &Message) -> Result<bool, AppError>;

    /// Returns `false` when the user owns no message with that id.
    async fn pull_message(&self, user_id: Uuid, message_id: Uuid) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_messages(&self, user_id: Uuid) -> Result<Vec<Message>, AppError>;

    async fn close(&self) {}
}

pub async fn create_pool(database_url: &str, retries: u32) -> anyhow::Result<DbPool> {
    let mut attempt = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < retries => {
                let delay = backoff_delay(attempt);
                attempt += 1;
                tracing::warn!(
                    "Database connection attempt {}/{} failed: {}; retrying in {:?}",
                    attempt,
                    retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "failed to connect to database after {} attempts",
                    attempt + 1
                )))
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF
        .checked_mul(1u32 << attempt.min(16))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}
