//! OpenAI-compatible LLM client used by the service core.
//!
//! Two logical profiles share one HTTP client:
//! - **embedding**: batch embeddings via `POST {base}/v1/embeddings`
//! - **chat**: streaming completions via `POST {base}/v1/chat/completions`
//!
//! A lightweight TTL-cached probe (`GET {base}/v1/models`) backs the
//! health endpoint. Construct once, wrap in `Arc`, and pass clones to
//! dependents.

mod config;
mod error_handler;
mod health_service;
mod openai_service;

pub use config::LlmConfig;
pub use error_handler::LlmError;
pub use health_service::EmbedderProbe;
pub use openai_service::{ChatMessage, ChatRole, LlmClient, TokenStream};
