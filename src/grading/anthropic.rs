//! Anthropic messages API grader.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{self, AttemptError};
use super::{prompt, validate_rubric, GradingBackend, GradingError, GradingRequest};
use crate::config::{ApiSettings, HttpSettings};
use crate::models::GradingResult;

const BACKEND: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicBackend {
    settings: ApiSettings,
    client: reqwest::Client,
    max_retries: u32,
    max_wait: Duration,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'static str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(settings: ApiSettings, http_settings: &HttpSettings) -> Result<Self, GradingError> {
        Ok(Self {
            client: http::build_client(BACKEND, http_settings)?,
            settings,
            max_retries: http_settings.max_retries,
            max_wait: http_settings.timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, request: &GradingRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system: prompt::SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt::user_prompt(request),
            }],
        }
    }

    async fn attempt(&self, body: &MessagesRequest<'_>) -> Result<String, AttemptError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| http::transport_error(BACKEND, e))?;

        if !response.status().is_success() {
            return Err(http::status_error(BACKEND, response).await);
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AttemptError::Retry(GradingError::unavailable(
                BACKEND,
                format!("unreadable response: {e}"),
            ))
        })?;
        reply_text(parsed)
    }
}

/// Concatenates the text blocks of a reply.
fn reply_text(response: MessagesResponse) -> Result<String, AttemptError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(AttemptError::Retry(GradingError::unavailable(
            BACKEND,
            "reply had no text content",
        )));
    }
    Ok(text)
}

#[async_trait]
impl GradingBackend for AnthropicBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, GradingError> {
        validate_rubric(&request.rubric)?;
        let body = self.request_body(request);
        let body = &body;

        let reply = http::with_retry(BACKEND, self.max_retries, self.max_wait, move || {
            self.attempt(body)
        })
        .await?;
        debug!(model = %self.settings.model, "anthropic returned a verdict");
        prompt::parse_verdict(BACKEND, request, &reply)
    }
}
