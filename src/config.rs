//! Configuration management.
//!
//! Configuration is set via environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completions endpoint.
//! - `OPENAI_BASE_URL` - Optional. Endpoint base URL. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. Model identifier. Defaults to `gpt-4o-mini`.
//! - `MAX_ITERATIONS` - Optional. Cap on reasoning/tool cycles per turn. Unset means unbounded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration, loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the reasoning engine
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,

    /// Optional cap on loop iterations per turn. `None` preserves the
    /// unbounded reference behavior.
    pub max_iterations: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let model = std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .ok()
            .map(|v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
                })
            })
            .transpose()?;

        Ok(Self {
            api_key,
            model,
            base_url,
            max_iterations,
        })
    }

    /// A fixed config for tests: no network identity, no iteration cap.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            base_url: "http://localhost:0".to_string(),
            max_iterations: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test covering all env interactions, so parallel tests never
    // race on process-wide variables.
    #[test]
    fn from_env_requires_api_key_and_applies_defaults() {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("DEFAULT_MODEL");
        std::env::remove_var("OPENAI_BASE_URL");
        std::env::remove_var("MAX_ITERATIONS");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "OPENAI_API_KEY"));

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.max_iterations, None);

        std::env::set_var("MAX_ITERATIONS", "7");
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_iterations, Some(7));

        std::env::set_var("MAX_ITERATIONS", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "MAX_ITERATIONS"));

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("MAX_ITERATIONS");
    }
}
