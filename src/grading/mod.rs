//! Automated submission grading behind a provider-agnostic contract.
//!
//! Every backend returns a [`GradingResult`] with all fields populated,
//! `suggested_grade` within `[0, max_marks]`, `confidence` within `[0, 1]` and
//! `rubric_scores` keyed exactly like the request's rubric. Backends that talk
//! to a remote model report failures through [`GradingError`] and never hand
//! back fabricated values.

pub mod anthropic;
pub mod http;
pub mod local;
pub mod openai;
pub mod prompt;
pub mod stub;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::{EngineConfig, Provider};
use crate::models::{GradingResult, Rubric};

pub use anthropic::AnthropicBackend;
pub use local::LocalModelBackend;
pub use openai::OpenAiBackend;
pub use stub::StubBackend;

pub const DEFAULT_MAX_MARKS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct GradingRequest {
    pub submission_text: String,
    pub rubric: Rubric,
    pub max_marks: u32,
}

impl GradingRequest {
    pub fn new(submission_text: impl Into<String>, rubric: Rubric) -> Self {
        Self {
            submission_text: submission_text.into(),
            rubric,
            max_marks: DEFAULT_MAX_MARKS,
        }
    }

    pub fn with_max_marks(mut self, max_marks: u32) -> Self {
        self.max_marks = max_marks;
        self
    }
}

/// Failures at the grading boundary.
#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("grading backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("invalid rubric: {reason}")]
    InvalidRubric { reason: String },

    #[error("grading backend {backend} is rate limited")]
    RateLimited {
        backend: String,
        retry_after: Option<Duration>,
    },
}

impl GradingError {
    pub fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        GradingError::Unavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GradingError::Unavailable { .. } | GradingError::RateLimited { .. }
        )
    }
}

#[async_trait]
pub trait GradingBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, GradingError>;
}

/// Builds the backend selected by `config`. Called once at startup.
pub fn build_backend(config: &EngineConfig) -> Result<Arc<dyn GradingBackend>, GradingError> {
    let backend: Arc<dyn GradingBackend> = match &config.provider {
        Provider::Stub => Arc::new(StubBackend),
        Provider::OpenAi(settings) => Arc::new(OpenAiBackend::new(settings.clone(), &config.http)?),
        Provider::Anthropic(settings) => {
            Arc::new(AnthropicBackend::new(settings.clone(), &config.http)?)
        }
        Provider::Local(settings) => {
            Arc::new(LocalModelBackend::new(settings.clone(), &config.http)?)
        }
    };

    info!(backend = backend.name(), "grading backend selected");
    Ok(backend)
}

/// Rejects rubrics a remote model cannot be asked to score against.
pub fn validate_rubric(rubric: &Rubric) -> Result<(), GradingError> {
    for (key, max_points) in rubric {
        if key.trim().is_empty() {
            return Err(GradingError::InvalidRubric {
                reason: "criterion names must not be blank".to_string(),
            });
        }
        if !max_points.is_finite() || *max_points < 0.0 {
            return Err(GradingError::InvalidRubric {
                reason: format!("criterion {key} has invalid max points {max_points}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;

    #[test]
    fn request_defaults_to_hundred_marks() {
        let request = GradingRequest::new("fn main() {}", Rubric::new());
        assert_eq!(request.max_marks, 100);
        assert_eq!(request.with_max_marks(40).max_marks, 40);
    }

    #[test]
    fn rubric_validation_rejects_bad_criteria() {
        let mut rubric = Rubric::new();
        rubric.insert("correctness".to_string(), 40.0);
        assert!(validate_rubric(&rubric).is_ok());

        rubric.insert(" ".to_string(), 10.0);
        assert!(matches!(
            validate_rubric(&rubric),
            Err(GradingError::InvalidRubric { .. })
        ));

        let mut negative = Rubric::new();
        negative.insert("style".to_string(), -5.0);
        assert!(matches!(
            validate_rubric(&negative),
            Err(GradingError::InvalidRubric { .. })
        ));

        let mut infinite = Rubric::new();
        infinite.insert("style".to_string(), f64::INFINITY);
        assert!(validate_rubric(&infinite).is_err());
    }

    #[test]
    fn only_backend_failures_are_retryable() {
        assert!(GradingError::unavailable("openai", "timeout").is_retryable());
        assert!(GradingError::RateLimited {
            backend: "openai".to_string(),
            retry_after: None
        }
        .is_retryable());
        assert!(!GradingError::InvalidRubric {
            reason: "empty".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn stub_provider_builds_stub_backend() {
        let config = EngineConfig {
            provider: Provider::Stub,
            http: HttpSettings::default(),
        };
        let backend = build_backend(&config).unwrap();
        assert_eq!(backend.name(), "stub");
    }
}
