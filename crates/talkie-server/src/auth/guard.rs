//! Page-level redirects driven only by whether the request carries a valid
//! session token. No store access happens here.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::routes::AppState;

use super::jwt::verify_session_token;
use super::session::extract_session_token;

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const SIGN_IN_PATH: &str = "/sign-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(&'static str),
}

/// Evaluated in order: signed-in users are bounced off the auth pages,
/// anonymous users are bounced off the private pages.
pub fn decide(has_session: bool, path: &str) -> GuardDecision {
    if has_session
        && (path == "/"
            || path == SIGN_IN_PATH
            || path == "/sign-up"
            || in_section(path, "/verify"))
    {
        return GuardDecision::Redirect(DASHBOARD_PATH);
    }

    if !has_session
        && (in_section(path, DASHBOARD_PATH) || in_section(path, "/verify") || in_section(path, "/u"))
    {
        return GuardDecision::Redirect(SIGN_IN_PATH);
    }

    GuardDecision::Pass
}

/// `/u` matches `/u` and `/u/alice`, never `/users`.
fn in_section(path: &str, section: &str) -> bool {
    path.strip_prefix(section)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let has_session = extract_session_token(request.headers())
        .is_some_and(|token| verify_session_token(&token, &state.config.session_secret).is_ok());

    match decide(has_session, request.uri().path()) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Redirect(to) => Redirect::temporary(to).into_response(),
    }
}
