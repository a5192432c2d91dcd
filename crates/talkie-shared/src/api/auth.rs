use serde::{Deserialize, Serialize};

use crate::models::SessionUser;

/// Envelope used by every endpoint that has nothing else to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInRequest {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentSessionResponse {
    pub success: bool,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}
