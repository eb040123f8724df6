//! Provider configuration for the embedding and chat profiles.

use crate::error_handler::LlmError;

/// Universal configuration for the OpenAI-compatible backend.
///
/// `api_base` must start with `https://` or `http://` to allow
/// custom/self-hosted gateways (use with caution).
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Base URL without the `/v1/...` suffix.
    pub api_base: String,
    /// Bearer credential for both profiles.
    pub api_key: String,
    /// Chat model identifier.
    pub chat_model: String,
    /// Embedding model identifier (1536-dimensional output expected).
    pub embedding_model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl LlmConfig {
    /// Creates a config against the public OpenAI endpoint.
    pub fn new(
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: "https://api.openai.com".into(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            connect_timeout_secs: 10,
        }
    }

    /// Validates config values.
    ///
    /// # Errors
    /// - [`LlmError::MissingApiKey`] if the key is empty
    /// - [`LlmError::InvalidEndpoint`] if the base URL is empty or missing http/https
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let base = self.api_base.trim();
        if base.is_empty() || !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(LlmError::InvalidEndpoint(self.api_base.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_endpoint_scheme() {
        let mut cfg = LlmConfig::new("sk-test", "gpt-5-mini", "text-embedding-3-small");
        assert!(cfg.validate().is_ok());

        cfg.api_base = "ftp://example.com".into();
        assert!(matches!(cfg.validate(), Err(LlmError::InvalidEndpoint(_))));

        cfg.api_base = "https://gateway.internal".into();
        cfg.api_key = "  ".into();
        assert!(matches!(cfg.validate(), Err(LlmError::MissingApiKey)));
    }
}
