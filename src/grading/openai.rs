//! OpenAI chat-completions grader.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::http::{self, AttemptError};
use super::{prompt, validate_rubric, GradingBackend, GradingError, GradingRequest};
use crate::config::{ApiSettings, HttpSettings};
use crate::models::GradingResult;

const BACKEND: &str = "openai";

pub struct OpenAiBackend {
    settings: ApiSettings,
    client: reqwest::Client,
    max_retries: u32,
    max_wait: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    response_format: serde_json::Value,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(settings: ApiSettings, http_settings: &HttpSettings) -> Result<Self, GradingError> {
        Ok(Self {
            client: http::build_client(BACKEND, http_settings)?,
            settings,
            max_retries: http_settings.max_retries,
            max_wait: http_settings.timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, request: &GradingRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            temperature: 0.0,
            response_format: json!({ "type": "json_object" }),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::user_prompt(request),
                },
            ],
        }
    }

    async fn attempt(&self, body: &ChatRequest<'_>) -> Result<String, AttemptError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| http::transport_error(BACKEND, e))?;

        if !response.status().is_success() {
            return Err(http::status_error(BACKEND, response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AttemptError::Retry(GradingError::unavailable(
                BACKEND,
                format!("unreadable response: {e}"),
            ))
        })?;
        reply_text(parsed)
    }
}

fn reply_text(response: ChatResponse) -> Result<String, AttemptError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AttemptError::Retry(GradingError::unavailable(BACKEND, "empty completion")))
}

#[async_trait]
impl GradingBackend for OpenAiBackend {
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
        debug!(model = %self.settings.model, "openai returned a verdict");
        prompt::parse_verdict(BACKEND, request, &reply)
    }
}
