//! Outbound email. Delivery goes through the Resend HTTP API when a key is
//! configured; otherwise messages are only written to the log.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

pub const VERIFICATION_SUBJECT: &str = "Talkie Verification Code";

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize)]
struct ResendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let body = ResendEmailBody {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach email provider")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("Email provider rejected message (status={status}): {text}")
    }
}

/// Development fallback: nothing leaves the process.
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        tracing::warn!(
            "No email provider configured; would send '{}' to {}:\n{}",
            subject,
            to,
            html
        );
        Ok(())
    }
}

pub fn render_verification_email(username: &str, code: &str) -> String {
    let username = escape_html(username);
    format!(
        "<!DOCTYPE html>\
<html lang=\"en\"><head><title>Verification Code</title></head>\
<body>\
<h2>Hello {username},</h2>\
<p>Thank you for registering. Please use the following verification code to complete your registration:</p>\
<p><strong>{code}</strong></p>\
<p>This code expires in one hour. If you did not request this code, please ignore this email.</p>\
</body></html>"
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
