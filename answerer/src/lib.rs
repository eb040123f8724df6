//! Grounded-answer pipeline: retrieval, prompt assembly, and chat
//! orchestration over the knowledge-base store and the LLM client.
//!
//! The flow mirrors the HTTP surface: the retrieval endpoint stops
//! after [`search_passages`]; the chat endpoint continues through
//! [`start_chat`] into a bounded token stream.

mod api_types;
mod ask;
mod embed;
mod error;
mod prompt;
mod retrieve;
pub mod timeouts;

pub use api_types::RetrievedPassage;
pub use ask::{
    AnswerStream, ChatTurnOutput, CHAT_MIN_SIMILARITY, CHAT_TOP_K, collect_answer, start_chat,
};
pub use embed::Embedder;
pub use error::AnswerError;
pub use prompt::{INSUFFICIENT_CONTEXT_PHRASE, SYSTEM_INSTRUCTION, build_system_text};
pub use retrieve::{SearchParams, search_passages, similarity_from_distance};
