use std::{error::Error, process, sync::Arc, time::Duration};

use tracing_subscriber::EnvFilter;

use api::{AppConfig, AppState, RuntimeEnv, StartError};
use kb_store::{KbConfig, KbStore};
use llm_service::{EmbedderProbe, LlmClient, LlmConfig};

/// How long one embedder probe verdict is served from cache.
const EMBEDDER_PROBE_TTL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    // Load environment variables from .env when present; real
    // deployments configure the process environment directly.
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            process::exit(1);
        }
    };

    init_tracing(&config);

    let state = match build_state(config).await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("startup failed: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = api::start(state).await {
        match err {
            StartError::Bind(e) => {
                tracing::error!("failed to bind listener: {e}");
                process::exit(2);
            }
            StartError::Server(e) => {
                tracing::error!("server error: {e}");
                process::exit(1);
            }
        }
    }
}

/// Wires the collaborators behind the shared state.
async fn build_state(config: AppConfig) -> Result<Arc<AppState>, Box<dyn Error>> {
    let store = KbStore::connect(&KbConfig::new(&config.database_url)).await?;

    let mut llm_cfg = LlmConfig::new(
        &config.openai_api_key,
        &config.llm_model,
        &config.embedding_model,
    );
    llm_cfg.api_base = config.openai_base_url.clone();
    let llm = LlmClient::new(llm_cfg)?;

    let probe = EmbedderProbe::for_client(&llm, EMBEDDER_PROBE_TTL)?;

    Ok(Arc::new(AppState::new(
        Arc::new(config),
        Arc::new(store),
        Arc::new(llm),
        Arc::new(probe),
    )))
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.env {
        RuntimeEnv::Production => builder.json().init(),
        _ => builder.compact().init(),
    }
}
