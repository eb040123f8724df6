use std::{env, fmt, sync::Arc};

use kb_store::KbStore;
use llm_service::{EmbedderProbe, LlmClient};

use crate::metrics::MetricsRegistry;
use crate::rate_limit::RateLimiter;

/// Runtime environment tag; only affects log formatting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuntimeEnv {
    Development,
    Test,
    Production,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Postgres DSN for the knowledge-base store.
    pub database_url: String,
    /// Credential for the embedding and chat provider.
    pub openai_api_key: String,
    /// Bearer secret protecting the mutating endpoints. At least 32 bytes.
    pub api_secret_token: String,
    /// CORS allowlist; the first entry doubles as the fallback origin.
    pub allowed_origins: Vec<String>,
    /// Chat model identifier.
    pub llm_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Provider base URL (overridable for self-hosted gateways).
    pub openai_base_url: String,
    /// Listener address, e.g. `0.0.0.0:8080`.
    pub bind_address: String,
    /// Runtime environment tag.
    pub env: RuntimeEnv,
}

/// Errors that may occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Required variable is missing or empty.
    MissingVar { name: &'static str },
    /// Variable is present but contains an invalid value.
    InvalidValue { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar { name } => {
                write!(f, "missing required environment variable: {}", name)
            }
            ConfigError::InvalidValue { name, reason } => {
                write!(f, "invalid value for {}: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load configuration strictly from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        fn must_var(name: &'static str) -> Result<String, ConfigError> {
            let v = env::var(name).map_err(|_| ConfigError::MissingVar { name })?;
            if v.trim().is_empty() {
                return Err(ConfigError::MissingVar { name });
            }
            Ok(v)
        }
        fn opt_var(name: &'static str, default: &str) -> String {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        let database_url = must_var("DATABASE_URL")?;
        let openai_api_key = must_var("OPENAI_API_KEY")?;
        let api_secret_token = must_var("API_SECRET_TOKEN")?;

        if api_secret_token.len() < 32 {
            return Err(ConfigError::InvalidValue {
                name: "API_SECRET_TOKEN",
                reason: "must be at least 32 bytes".into(),
            });
        }

        let allowed_origins: Vec<String> = opt_var("ALLOWED_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if allowed_origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "ALLOWED_ORIGINS",
                reason: "expected at least one origin".into(),
            });
        }

        let openai_base_url = opt_var("OPENAI_BASE_URL", "https://api.openai.com");
        if !(openai_base_url.starts_with("http://") || openai_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: "OPENAI_BASE_URL",
                reason: "expected http(s) URL".into(),
            });
        }

        let env_tag = opt_var("APP_ENV", "development");
        let env = match env_tag.as_str() {
            "development" => RuntimeEnv::Development,
            "test" => RuntimeEnv::Test,
            "production" => RuntimeEnv::Production,
            other => {
                return Err(ConfigError::InvalidValue {
                    name: "APP_ENV",
                    reason: format!("unknown environment: {other}"),
                });
            }
        };

        Ok(Self {
            database_url,
            openai_api_key,
            api_secret_token,
            allowed_origins,
            llm_model: opt_var("LLM_MODEL", "gpt-5-mini"),
            embedding_model: opt_var("EMBEDDING_MODEL", "text-embedding-3-small"),
            openai_base_url,
            bind_address: opt_var("API_ADDRESS", "0.0.0.0:8080"),
            env,
        })
    }
}

/// Shared application state for all HTTP handlers.
pub struct AppState {
    /// Immutable configuration.
    pub config: Arc<AppConfig>,
    /// Knowledge-base store (read side).
    pub store: Arc<KbStore>,
    /// Embedding + chat provider client.
    pub llm: Arc<LlmClient>,
    /// TTL-cached embedder reachability probe.
    pub embedder_probe: Arc<EmbedderProbe>,
    /// Sliding-window rate-limit table.
    pub rate_limiter: RateLimiter,
    /// Per-endpoint request metrics.
    pub metrics: MetricsRegistry,
}

impl AppState {
    /// Create state from pre-built collaborators.
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<KbStore>,
        llm: Arc<LlmClient>,
        embedder_probe: Arc<EmbedderProbe>,
    ) -> Self {
        Self {
            config,
            store,
            llm,
            embedder_probe,
            rate_limiter: RateLimiter::new(),
            metrics: MetricsRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var mutation is process-global; keep the whole scenario in
    // one test to avoid cross-test interference.
    #[test]
    fn from_env_validates_and_defaults() {
        let set = |k: &'static str, v: &str| unsafe { env::set_var(k, v) };
        let unset = |k: &'static str| unsafe { env::remove_var(k) };

        for k in [
            "DATABASE_URL",
            "OPENAI_API_KEY",
            "API_SECRET_TOKEN",
            "ALLOWED_ORIGINS",
            "LLM_MODEL",
            "EMBEDDING_MODEL",
            "OPENAI_BASE_URL",
            "API_ADDRESS",
            "APP_ENV",
        ] {
            unset(k);
        }

        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingVar {
                name: "DATABASE_URL"
            })
        ));

        set("DATABASE_URL", "postgres://localhost/hrkb");
        set("OPENAI_API_KEY", "sk-test");
        set("API_SECRET_TOKEN", "short");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidValue {
                name: "API_SECRET_TOKEN",
                ..
            })
        ));

        set("API_SECRET_TOKEN", "0123456789abcdef0123456789abcdef");
        let cfg = AppConfig::from_env().expect("valid config");
        assert_eq!(cfg.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.llm_model, "gpt-5-mini");
        assert_eq!(cfg.env, RuntimeEnv::Development);

        set(
            "ALLOWED_ORIGINS",
            "https://hr.example.com, https://intranet.example.com",
        );
        set("APP_ENV", "production");
        let cfg = AppConfig::from_env().expect("valid config");
        assert_eq!(
            cfg.allowed_origins,
            vec!["https://hr.example.com", "https://intranet.example.com"]
        );
        assert_eq!(cfg.env, RuntimeEnv::Production);

        set("APP_ENV", "staging");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidValue {
                name: "APP_ENV",
                ..
            })
        ));
    }
}
