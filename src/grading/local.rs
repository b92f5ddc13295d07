//! Grader backed by a local Ollama-compatible model server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{self, AttemptError};
use super::{prompt, validate_rubric, GradingBackend, GradingError, GradingRequest};
use crate::config::{HttpSettings, LocalSettings};
use crate::models::GradingResult;

const BACKEND: &str = "local";

pub struct LocalModelBackend {
    settings: LocalSettings,
    client: reqwest::Client,
    max_retries: u32,
    max_wait: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    format: &'static str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl LocalModelBackend {
    pub fn new(settings: LocalSettings, http_settings: &HttpSettings) -> Result<Self, GradingError> {
        Ok(Self {
            client: http::build_client(BACKEND, http_settings)?,
            settings,
            max_retries: http_settings.max_retries,
            max_wait: http_settings.timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, request: &GradingRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            stream: false,
            format: "json",
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
        Ok(parsed.message.content)
    }
}

#[async_trait]
impl GradingBackend for LocalModelBackend {
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
        debug!(model = %self.settings.model, "local model returned a verdict");
        prompt::parse_verdict(BACKEND, request, &reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rubric;

    fn backend(max_retries: u32) -> LocalModelBackend {
        LocalModelBackend::new(
            LocalSettings {
                base_url: "http://127.0.0.1:1/".to_string(),
                model: "llama-test".to_string(),
            },
            &HttpSettings {
                timeout: Duration::from_millis(500),
                max_retries,
            },
        )
        .unwrap()
    }

    #[test]
    fn body_disables_streaming() {
        let backend = backend(0);
        let body =
            serde_json::to_value(backend.request_body(&GradingRequest::new("x", Rubric::new())))
                .unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], "json");
        assert_eq!(backend.endpoint(), "http://127.0.0.1:1/api/chat");
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable_after_retries() {
        let mut rubric = Rubric::new();
        rubric.insert("design".to_string(), 20.0);
        let err = backend(1)
            .grade(&GradingRequest::new("x", rubric))
            .await
            .unwrap_err();
        assert!(matches!(err, GradingError::Unavailable { .. }));
        assert!(err.to_string().contains("local"));
    }
}
