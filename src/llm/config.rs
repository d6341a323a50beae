//! Completion client configuration

use std::fmt;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Endpoint, credential and model for the completion backend
#[derive(Clone)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            endpoint: non_empty("TUTOR_LLM_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: non_empty("TUTOR_LLM_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")),
            model: non_empty("TUTOR_LLM_MODEL").unwrap_or(defaults.model),
            timeout: non_empty("TUTOR_LLM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

// Keep the credential out of logs
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
