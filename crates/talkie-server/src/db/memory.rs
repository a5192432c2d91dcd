use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use talkie_shared::Message;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Registration, UserRecord, UserStore, VerifyOutcome};
use crate::error::AppError;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    messages: HashMap<Uuid, Vec<Message>>,
}

/// Process-local [`UserStore`]. Each operation runs under one lock
/// acquisition, which gives it the same atomicity as the SQL statements in
/// [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let state = self.state.read().await;
        let user = state
            .users
            .values()
            .filter(|u| u.username == username)
            .max_by_key(|u| (u.is_verified, u.created_at))
            .cloned();
        Ok(user)
    }

    async fn find_verified_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let state = self.state.read().await;
        let user = state
            .users
            .values()
            .find(|u| u.is_verified && u.username == username)
            .cloned();
        Ok(user)
    }

    async fn create_user(&self, registration: Registration) -> Result<UserRecord, AppError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == registration.email) {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: registration.username,
            email: registration.email,
            password_hash: registration.password_hash,
            is_verified: false,
            verify_code: registration.verify_code,
            verify_code_expiry: registration.verify_code_expiry,
            is_accepting_messages: true,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_pending_registration(
        &self,
        id: Uuid,
        registration: Registration,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&id).filter(|u| !u.is_verified) {
            user.username = registration.username;
            user.password_hash = registration.password_hash;
            user.verify_code = registration.verify_code;
            user.verify_code_expiry = registration.verify_code_expiry;
        }
        Ok(())
    }

    async fn consume_verify_code(
        &self,
        username: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, AppError> {
        let mut state = self.state.write().await;

        let mut pending = state
            .users
            .values()
            .filter(|u| !u.is_verified && u.username == username && u.verify_code == code)
            .peekable();
        if pending.peek().is_none() {
            return Ok(VerifyOutcome::NotFound);
        }

        let Some(id) = pending
            .find(|u| u.verify_code_expiry > now)
            .map(|u| u.id)
        else {
            return Ok(VerifyOutcome::Expired);
        };

        if state
            .users
            .values()
            .any(|u| u.is_verified && u.username == username)
        {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        if let Some(user) = state.users.get_mut(&id) {
            user.is_verified = true;
            user.verify_code.clear();
            user.verify_code_expiry = DateTime::<Utc>::default();
        }

        Ok(VerifyOutcome::Verified)
    }

    async fn set_accepting_messages(
        &self,
        id: Uuid,
        accepting: bool,
    ) -> Result<Option<bool>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|user| {
            user.is_accepting_messages = accepting;
            user.is_accepting_messages
        }))
    }

    async fn push_message(&self, user_id: Uuid, message: &Message) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let accepting = state
            .users
            .get(&user_id)
            .is_some_and(|u| u.is_accepting_messages);
        if !accepting {
            return Ok(false);
        }

        state
            .messages
            .entry(user_id)
            .or_default()
            .push(message.clone());
        Ok(true)
    }

    async fn pull_message(&self, user_id: Uuid, message_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let Some(messages) = state.messages.get_mut(&user_id) else {
            return Ok(false);
        };

        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        Ok(messages.len() < before)
    }

    async fn list_messages(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let state = self.state.read().await;
        let mut messages = state.messages.get(&user_id).cloned().unwrap_or_default();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }
}
