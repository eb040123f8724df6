//! TTL-cached health probe for the embedding provider.
//!
//! Probe: `GET {base}/v1/models` with Bearer auth. The result is cached
//! so the health endpoint does not hammer the provider; a stale cache
//! entry triggers one fresh probe. The check is **resilient**: it never
//! returns an error, only `false`.

use std::time::{Duration, Instant};

use reqwest::header;
use tokio::sync::Mutex;
use tracing::debug;

use crate::openai_service::LlmClient;

/// Cached reachability probe for the embedding provider.
pub struct EmbedderProbe {
    client: reqwest::Client,
    url_models: String,
    ttl: Duration,
    cached: Mutex<Option<(Instant, bool)>>,
}

impl EmbedderProbe {
    /// Builds a probe sharing the target and credential of `llm`.
    ///
    /// # Errors
    /// Returns the `reqwest` build error if the probe client cannot be
    /// constructed.
    pub fn for_client(llm: &LlmClient, ttl: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        if let Ok(mut auth) = header::HeaderValue::from_str(&format!("Bearer {}", llm.api_key())) {
            auth.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url_models: format!("{}/v1/models", llm.api_base()),
            ttl,
            cached: Mutex::new(None),
        })
    }

    /// Returns provider reachability, serving the cached verdict while
    /// it is fresh.
    pub async fn check(&self) -> bool {
        let mut cached = self.cached.lock().await;
        if let Some((at, ok)) = *cached {
            if at.elapsed() < self.ttl {
                return ok;
            }
        }

        debug!("GET {}", self.url_models);
        let ok = match self.client.get(&self.url_models).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        };

        *cached = Some((Instant::now(), ok));
        ok
    }
}
