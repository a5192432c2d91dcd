use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, route_guard};
use crate::config::Config;
use crate::db::UserStore;
use crate::handlers::{self, auth as auth_handlers, messages as message_handlers};
use crate::mail::EmailSender;
use crate::suggest::SuggestionProvider;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub mailer: Arc<dyn EmailSender>,
    pub suggester: Arc<dyn SuggestionProvider>,
    pub config: Config,
}

pub fn create_router(state: AppState) -> Router {
    // Public routes (no middleware)
    let public_routes = Router::new()
        .route("/sign-up", post(auth_handlers::sign_up))
        .route("/verify-code", post(auth_handlers::verify_code))
        .route("/auth/sign-in", post(auth_handlers::sign_in))
        .route("/auth/sign-out", post(auth_handlers::sign_out))
        .route(
            "/check-username-unique",
            get(auth_handlers::check_username_unique),
        )
        .route("/send-message", post(message_handlers::send_message))
        .route("/suggest-messages", post(message_handlers::suggest_messages));

    // Protected routes with auth middleware
    let protected_routes = Router::new()
        .route("/auth/session", get(auth_handlers::session))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route(
            "/accept-messages",
            post(message_handlers::set_accept_messages).get(message_handlers::get_accept_messages),
        )
        .route("/get-messages", get(message_handlers::get_messages))
        .route(
            "/delete-message/:message_id",
            delete(message_handlers::delete_message),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // The guard wraps the fallback too, so page paths are redirected even
    // though no pages are served here.
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .fallback(handlers::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
