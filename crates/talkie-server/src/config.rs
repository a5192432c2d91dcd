use std::env;

use anyhow::Context;

#[derive(Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_connect_retries: u32,
    pub session_secret: String,
    pub session_expires_in: i64,
    pub session_cookie_secure: bool,
    pub port: u16,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: optional("DATABASE_URL"),
            database_connect_retries: env::var("DATABASE_CONNECT_RETRIES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_CONNECT_RETRIES must be a number")?,
            session_secret: env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            session_expires_in: env::var("SESSION_EXPIRES_IN")
                .unwrap_or_else(|_| "2592000".to_string()) // 30 days
                .parse()
                .context("SESSION_EXPIRES_IN must be a number of seconds")?,
            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            resend_api_key: optional("RESEND_API_KEY"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "onboarding@resend.dev".to_string()),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
        })
    }

    /// Settings for tests and local experiments: in-memory store, no outbound providers.
    pub fn for_testing(session_secret: &str) -> Self {
        Self {
            database_url: None,
            database_connect_retries: 0,
            session_secret: session_secret.to_string(),
            session_expires_in: 3600,
            session_cookie_secure: false,
            port: 0,
            resend_api_key: None,
            email_from: "onboarding@resend.dev".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("database_connect_retries", &self.database_connect_retries)
            .field("session_secret", &"***")
            .field("session_expires_in", &self.session_expires_in)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("port", &self.port)
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "***"))
            .field("email_from", &self.email_from)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .finish()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
