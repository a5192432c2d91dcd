#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use talkie_server::{
    create_router,
    db::UserStore,
    mail::EmailSender,
    suggest::{StaticSuggester, SuggestionProvider},
    AppState, Config, MemoryStore,
};
use tower::ServiceExt;

pub const SECRET: &str = "test-session-secret";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Code from the most recent email to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let email = sent.iter().rev().find(|e| e.to == to)?;
        let start = email.html.find("<strong>")? + "<strong>".len();
        let end = email.html[start..].find("</strong>")? + start;
        Some(email.html[start..end].to_string())
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl EmailSender for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> anyhow::Result<()> {
        anyhow::bail!("provider unavailable")
    }
}

pub struct FailingSuggester;

#[async_trait]
impl SuggestionProvider for FailingSuggester {
    async fn suggest(&self) -> anyhow::Result<String> {
        anyhow::bail!("provider unavailable")
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_providers(Arc::new(RecordingMailer::default()), None, Arc::new(StaticSuggester))
    }

    pub fn with_mailer(mailer: Arc<dyn EmailSender>) -> Self {
        Self::with_providers(Arc::new(RecordingMailer::default()), Some(mailer), Arc::new(StaticSuggester))
    }

    pub fn with_suggester(suggester: Arc<dyn SuggestionProvider>) -> Self {
        Self::with_providers(Arc::new(RecordingMailer::default()), None, suggester)
    }

    fn with_providers(
        recorder: Arc<RecordingMailer>,
        mailer: Option<Arc<dyn EmailSender>>,
        suggester: Arc<dyn SuggestionProvider>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            store: store.clone() as Arc<dyn UserStore>,
            mailer: mailer.unwrap_or_else(|| recorder.clone() as Arc<dyn EmailSender>),
            suggester,
            config: Config::for_testing(SECRET),
        };

        Self {
            router: create_router(state),
            store,
            mailer: recorder,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/sign-up",
            Some(serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            })),
            None,
        )
        .await
    }

    pub async fn verify(&self, username: &str, code: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/verify-code",
            Some(serde_json::json!({ "username": username, "code": code })),
            None,
        )
        .await
    }

    pub async fn sign_in(&self, identifier: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/auth/sign-in",
            Some(serde_json::json!({ "identifier": identifier, "password": password })),
            None,
        )
        .await
    }

    pub async fn send_message(&self, username: &str, content: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/send-message",
            Some(serde_json::json!({ "username": username, "content": content })),
            None,
        )
        .await
    }

    pub async fn set_accepting(&self, token: &str, accept: bool) -> TestResponse {
        self.call(
            Method::POST,
            "/api/accept-messages",
            Some(serde_json::json!({ "accept_messages": accept })),
            Some(token),
        )
        .await
    }

    pub async fn messages(&self, token: &str) -> TestResponse {
        self.call(Method::GET, "/api/get-messages", None, Some(token))
            .await
    }

    /// Sign up, verify and sign in; returns the session token.
    pub async fn registered_user(&self, username: &str, email: &str, password: &str) -> String {
        assert_eq!(
            self.sign_up(username, email, password).await.status,
            StatusCode::CREATED
        );
        let code = self.mailer.last_code_for(email).unwrap();
        assert_eq!(self.verify(username, &code).await.status, StatusCode::OK);

        let response = self.sign_in(email, password).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["token"].as_str().unwrap().to_string()
    }
}

/// A code of the right shape that differs from `code`.
pub fn other_code(code: &str) -> String {
    if code == "12345" {
        "54321".to_string()
    } else {
        "12345".to_string()
    }
}
