use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, routes::AppState};

use super::jwt::{verify_session_token, Claims};
use super::session::extract_session_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub claims: Claims,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_session_token(request.headers()).ok_or_else(AppError::unauthorized)?;

    let claims = verify_session_token(&token, &state.config.session_secret)?;

    let auth_user = AuthUser {
        id: claims.sub,
        claims,
    };

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
