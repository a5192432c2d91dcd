//! Conversation-starter suggestions shown on the public message page.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const SEPARATOR: &str = "||";

const PROMPT: &str = "Create a list of three open-ended and engaging questions formatted as a single string. \
Each question should be separated by '||'. These questions are for an anonymous social messaging platform, \
and should be suitable for a diverse audience. Avoid personal or sensitive topics, focusing instead on \
universal themes that encourage friendly interaction. For example, your output should be structured like this: \
'What's a hobby you've recently started?||If you could have dinner with any historical figure, who would it be?||\
What's a simple thing that makes you happy?'. Ensure the questions are intriguing, foster curiosity, and \
contribute to a positive and welcoming conversational environment.";

const FALLBACK: &str = "What's a hobby you've recently started?||\
If you could have dinner with any historical figure, who would it be?||\
What's a simple thing that makes you happy?";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Raw provider output, questions joined by [`SEPARATOR`].
    async fn suggest(&self) -> anyhow::Result<String>;
}

/// Used when no provider key is configured.
pub struct StaticSuggester;

#[async_trait]
impl SuggestionProvider for StaticSuggester {
    async fn suggest(&self) -> anyhow::Result<String> {
        Ok(FALLBACK.to_string())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct GeminiSuggester {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiSuggester {
    pub fn new(api_key: String, model: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build suggestion client")?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl SuggestionProvider for GeminiSuggester {
    async fn suggest(&self) -> anyhow::Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: PROMPT }],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach suggestion provider")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Suggestion provider failed (status={status}): {text}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Malformed suggestion provider response")?;

        parsed
            .text()
            .context("Suggestion provider returned no text")
    }
}

/// Split provider output into individual questions, dropping blanks.
pub fn split_suggestions(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
