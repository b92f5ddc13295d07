use std::time::Duration;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";
const DEFAULT_LOCAL_MODEL: &str = "llama3.1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown AI_PROVIDER {0:?} (expected stub, openai, anthropic or local)")]
    UnknownProvider(String),

    #[error("{provider} provider selected but {variable} is not set")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },

    #[error("{variable} has invalid value {value:?}")]
    InvalidValue {
        variable: &'static str,
        value: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

// Keeps credentials out of logs and panic messages.
impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSettings {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Which implementation satisfies the grading contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Stub,
    OpenAi(ApiSettings),
    Anthropic(ApiSettings),
    Local(LocalSettings),
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Stub => "stub",
            Provider::OpenAi(_) => "openai",
            Provider::Anthropic(_) => "anthropic",
            Provider::Local(_) => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub provider: Provider,
    pub http: HttpSettings,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider_name = get("AI_PROVIDER").unwrap_or_else(|| "stub".to_string());
        let provider = match provider_name.to_ascii_lowercase().as_str() {
            "stub" => Provider::Stub,
            "openai" => Provider::OpenAi(ApiSettings {
                api_key: get("OPENAI_API_KEY").ok_or(ConfigError::MissingCredential {
                    provider: "openai",
                    variable: "OPENAI_API_KEY",
                })?,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            }),
            "anthropic" => Provider::Anthropic(ApiSettings {
                api_key: get("ANTHROPIC_API_KEY").ok_or(ConfigError::MissingCredential {
                    provider: "anthropic",
                    variable: "ANTHROPIC_API_KEY",
                })?,
                model: get("ANTHROPIC_MODEL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                base_url: get("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            }),
            "local" => Provider::Local(LocalSettings {
                base_url: get("LOCAL_MODEL_URL").unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string()),
                model: get("LOCAL_MODEL").unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            }),
            _ => return Err(ConfigError::UnknownProvider(provider_name)),
        };

        let timeout_secs = parse_var(&get, "GRADING_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                variable: "GRADING_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let max_retries = parse_var(&get, "GRADING_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;

        Ok(Self {
            provider,
            http: HttpSettings {
                timeout: Duration::from_secs(timeout_secs),
                max_retries,
            },
        })
    }
}

fn parse_var<G, T>(get: &G, variable: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(variable) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { variable, value }),
    }
}
