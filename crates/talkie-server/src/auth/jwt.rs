use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use talkie_shared::SessionUser;
use uuid::Uuid;

use crate::error::AppError;

/// Session claims. A snapshot of the account taken when the token is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // User ID
    pub username: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
}

impl Claims {
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.sub,
            username: self.username.clone(),
            is_verified: self.is_verified,
            is_accepting_messages: self.is_accepting_messages,
        }
    }
}

pub fn create_session_token(
    user: &SessionUser,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expires_in_secs);

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        is_verified: user.is_verified,
        is_accepting_messages: user.is_accepting_messages,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::unauthorized()
    })?;

    Ok(token_data.claims)
}
