use axum::{
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use talkie_shared::{
    api::{
        AcceptMessagesRequest, AcceptMessagesResponse, ApiResponse, MessagesResponse,
        SendMessageRequest, SuggestionsResponse,
    },
    Message, SessionUser,
};
use uuid::Uuid;

use crate::auth::{create_session_token, session_cookie, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;
use crate::suggest::split_suggestions;

use super::extract::Payload;
use super::validation::validate_message_content;

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// POST /api/accept-messages
///
/// The caller's session cookie is re-issued so its claims follow the new flag.
pub async fn set_accept_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Payload(req): Payload<AcceptMessagesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let is_accepting_messages = state
        .store
        .set_accepting_messages(user.id, req.accept_messages)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        "User {} set accepting messages to {}",
        user.id,
        is_accepting_messages
    );

    let session_user = SessionUser {
        is_accepting_messages,
        ..user.claims.session_user()
    };
    let token = create_session_token(
        &session_user,
        &state.config.session_secret,
        state.config.session_expires_in,
    )?;
    let cookie = session_cookie(&state.config, &token)?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(AcceptMessagesResponse {
            success: true,
            message: "Message preference updated successfully".to_string(),
            is_accepting_messages,
        }),
    ))
}

/// GET /api/accept-messages
pub async fn get_accept_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AcceptMessagesResponse>, AppError> {
    let record = state
        .store
        .find_by_id(user.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(AcceptMessagesResponse {
        success: true,
        message: "Message preference fetched successfully".to_string(),
        is_accepting_messages: record.is_accepting_messages,
    }))
}

/// GET /api/get-messages
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessagesResponse>, AppError> {
    if state.store.find_by_id(user.id).await?.is_none() {
        return Err(user_not_found());
    }

    let messages = state.store.list_messages(user.id).await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// DELETE /api/delete-message/:message_id
///
/// Only messages owned by the session's user id are eligible.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse>, AppError> {
    let not_found = || AppError::NotFound("Message not found".to_string());
    let message_id = Uuid::parse_str(&message_id).map_err(|_| not_found())?;

    if !state.store.pull_message(user.id, message_id).await? {
        return Err(not_found());
    }

    Ok(Json(ApiResponse::ok("Message deleted successfully")))
}

/// POST /api/send-message
///
/// Public. Nothing about the sender is read or stored.
pub async fn send_message(
    State(state): State<AppState>,
    Payload(req): Payload<SendMessageRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    validate_message_content(&req.content)?;

    let recipient = state
        .store
        .find_by_username(req.username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Recipient user not found".to_string()))?;

    let not_accepting = || AppError::Forbidden("Recipient is not accepting messages".to_string());
    if !recipient.is_accepting_messages {
        return Err(not_accepting());
    }

    let message = Message {
        id: Uuid::new_v4(),
        content: req.content,
        created_at: Utc::now(),
    };

    // The flag may flip between the read above and this append.
    if !state.store.push_message(recipient.id, &message).await? {
        return Err(not_accepting());
    }

    tracing::debug!("Delivered message {} to user {}", message.id, recipient.id);

    Ok(Json(ApiResponse::ok("Message sent successfully")))
}

/// POST /api/suggest-messages
pub async fn suggest_messages(
    State(state): State<AppState>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let raw = state
        .suggester
        .suggest()
        .await
        .map_err(|e| AppError::Internal(e.context("Failed to generate suggestions")))?;

    Ok(Json(SuggestionsResponse {
        success: true,
        suggestions: split_suggestions(&raw),
    }))
}
