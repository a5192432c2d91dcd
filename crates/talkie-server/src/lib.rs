pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod routes;
pub mod suggest;

use std::sync::Arc;

pub use config::Config;
pub use db::{DbPool, MemoryStore, PgStore, UserStore};
pub use error::AppError;
pub use routes::{create_router, AppState};

use mail::{EmailSender, LogMailer, ResendMailer};
use suggest::{GeminiSuggester, StaticSuggester, SuggestionProvider};

/// Open the store and wire the outbound providers described by `config`.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_connect_retries).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: Arc<dyn EmailSender> = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.email_from.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set; verification emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let suggester: Arc<dyn SuggestionProvider> = match &config.gemini_api_key {
        Some(key) => Arc::new(GeminiSuggester::new(
            key.clone(),
            config.gemini_model.clone(),
        )?),
        None => Arc::new(StaticSuggester),
    };

    Ok(AppState {
        store,
        mailer,
        suggester,
        config,
    })
}
