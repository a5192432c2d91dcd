use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and state snapshot carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
}
