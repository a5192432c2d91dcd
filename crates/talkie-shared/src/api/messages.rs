use serde::{Deserialize, Serialize};

use crate::models::Message;

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptMessagesRequest {
    pub accept_messages: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptMessagesResponse {
    pub success: bool,
    pub message: String,
    pub is_accepting_messages: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    pub suggestions: Vec<String>,
}
