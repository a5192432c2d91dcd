use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use talkie_shared::api::{
    ApiResponse, CurrentSessionResponse, SessionResponse, SignInRequest, SignUpRequest,
    UsernameQuery, VerifyCodeRequest,
};

use crate::auth::{
    clear_session_cookie, create_session_token, generate_verify_code, hash_password,
    is_well_formed_code, session_cookie, verify_password, AuthUser,
};
use crate::db::{Registration, UserRecord, VerifyOutcome};
use crate::error::AppError;
use crate::mail::{render_verification_email, VERIFICATION_SUBJECT};
use crate::routes::AppState;

use super::extract::{Payload, QueryParams};
use super::validation::{normalize_email, validate_password, validate_username};

/// POST /api/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Payload(req): Payload<SignUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), AppError> {
    let username = validate_username(req.username.trim())?.to_string();
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    if state
        .store
        .find_verified_by_username(&username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let (verify_code, verify_code_expiry) = generate_verify_code(Utc::now());
    let registration = Registration {
        username: username.clone(),
        email: email.clone(),
        password_hash: hash_password(&req.password)?,
        verify_code: verify_code.clone(),
        verify_code_expiry,
    };

    match state.store.find_by_email(&email).await? {
        Some(existing) if existing.is_verified => {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }
        Some(existing) => {
            tracing::info!("Refreshing pending registration for user {}", existing.id);
            state
                .store
                .update_pending_registration(existing.id, registration)
                .await?;
        }
        None => {
            let user = state.store.create_user(registration).await?;
            tracing::info!("Registered user {}", user.id);
        }
    }

    let html = render_verification_email(&username, &verify_code);
    state
        .mailer
        .send(&email, VERIFICATION_SUBJECT, &html)
        .await
        .map_err(|e| AppError::Internal(e.context("Failed to send verification email")))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User registered successfully. Verification email sent.",
        )),
    ))
}

/// POST /api/verify-code
pub async fn verify_code(
    State(state): State<AppState>,
    Payload(req): Payload<VerifyCodeRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    let username = urlencoding::decode(&req.username)
        .map_err(|_| AppError::Validation("Invalid username".to_string()))?;
    let code = req.code.trim();

    // A code that could never have been issued cannot match any account.
    if !is_well_formed_code(code) {
        return Err(invalid_code());
    }

    match state
        .store
        .consume_verify_code(&username, code, Utc::now())
        .await?
    {
        VerifyOutcome::Verified => {
            tracing::info!("Verified account for username {}", username);
            Ok(Json(ApiResponse::ok("Email verified successfully.")))
        }
        VerifyOutcome::Expired => Err(AppError::CodeExpired),
        VerifyOutcome::NotFound => Err(invalid_code()),
    }
}

fn invalid_code() -> AppError {
    AppError::NotFound("Invalid username or verification code".to_string())
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Payload(req): Payload<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = req.identifier.trim();

    let user = if identifier.contains('@') {
        state.store.find_by_email(&identifier.to_lowercase()).await?
    } else {
        state.store.find_by_username(identifier).await?
    };

    let user = user.ok_or_else(|| AppError::Unauthorized("No account found".to_string()))?;

    if !user.is_verified {
        return Err(AppError::Unauthorized(
            "Email not verified. Please verify your email before signing in.".to_string(),
        ));
    }

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::debug!("Rejected sign-in for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    issue_session(&state, &user)
}

/// POST /api/auth/refresh
///
/// Re-reads the account so the new token reflects current state.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_by_id(auth_user.id)
        .await?
        .filter(|u| u.is_verified)
        .ok_or_else(AppError::unauthorized)?;

    issue_session(&state, &user)
}

/// POST /api/auth/sign-out
pub async fn sign_out(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cookie = clear_session_cookie(&state.config)?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::ok("Signed out")),
    ))
}

/// GET /api/auth/session
pub async fn session(Extension(auth_user): Extension<AuthUser>) -> Json<CurrentSessionResponse> {
    Json(CurrentSessionResponse {
        success: true,
        user: auth_user.claims.session_user(),
    })
}

/// GET /api/check-username-unique?username=
pub async fn check_username_unique(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<UsernameQuery>,
) -> Result<Json<ApiResponse>, AppError> {
    let username = validate_username(query.username.trim())?;

    if state
        .store
        .find_verified_by_username(username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    Ok(Json(ApiResponse::ok("Username is unique")))
}

fn issue_session(
    state: &AppState,
    user: &UserRecord,
) -> Result<impl IntoResponse, AppError> {
    let session_user = user.session_user();
    let token = create_session_token(
        &session_user,
        &state.config.session_secret,
        state.config.session_expires_in,
    )?;
    let cookie = session_cookie(&state.config, &token)?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            success: true,
            token,
            user: session_user,
        }),
    ))
}
