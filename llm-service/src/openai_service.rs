//! OpenAI-compatible client for embeddings and streaming chat.
//!
//! Supported operations:
//! - `POST {base}/v1/embeddings`       — batch embeddings retrieval
//! - `POST {base}/v1/chat/completions` — streaming chat completion (SSE)
//!
//! The streaming call returns a token stream that yields incremental
//! text fragments in provider order. Dropping the stream aborts the
//! underlying connection, which is how cancellation propagates when a
//! client disconnects mid-answer.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmConfig;
use crate::error_handler::LlmError;

/// Ordered stream of incremental answer fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Conversation roles accepted from clients. System text is composed
/// server-side and never arrives through this type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One conversation turn as sent to the provider.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Thin client for an OpenAI-compatible API.
///
/// Initialized with a full [`LlmConfig`]. Reuses one HTTP client with
/// default auth headers across both profiles.
pub struct LlmClient {
    client: reqwest::Client,
    cfg: LlmConfig,
    url_chat: String,
    url_embeddings: String,
}

impl LlmClient {
    /// Creates a new client from the given config.
    ///
    /// # Errors
    /// - [`LlmError::MissingApiKey`] / [`LlmError::InvalidEndpoint`] from validation
    /// - [`LlmError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmConfig) -> Result<Self, LlmError> {
        cfg.validate()?;

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))
            .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // No global request timeout: streaming completions outlive any
        // sane fixed bound. Callers wrap each await in its own budget.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .default_headers(headers)
            .build()?;

        let base = cfg.api_base.trim_end_matches('/').to_string();
        let url_chat = format!("{base}/v1/chat/completions");
        let url_embeddings = format!("{base}/v1/embeddings");

        Ok(Self {
            client,
            cfg,
            url_chat,
            url_embeddings,
        })
    }

    /// Base URL of the configured provider (no trailing slash).
    pub fn api_base(&self) -> &str {
        self.cfg.api_base.trim_end_matches('/')
    }

    /// Bearer credential, for wiring sibling components (the probe).
    pub(crate) fn api_key(&self) -> &str {
        &self.cfg.api_key
    }

    /// Retrieves embeddings for a batch of inputs via `/v1/embeddings`.
    ///
    /// Output vectors are returned in input order regardless of the
    /// order the provider lists them in.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] for non-2xx responses
    /// - [`LlmError::Transport`] for client errors
    /// - [`LlmError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.embedding_model, batch = texts.len()))]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.embedding_model,
            input: texts,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(LlmError::HttpStatus {
                status: resp.status(),
                url: self.url_embeddings.clone(),
            });
        }

        let out: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("serde error: {e}; expected `data[].embedding`")))?;

        parse_embeddings(out, texts.len())
    }

    /// Starts a streaming chat completion via `/v1/chat/completions`.
    ///
    /// The system text goes first, followed by the conversation turns
    /// unmodified. Fragments arrive in provider order; the stream ends
    /// after the provider's `[DONE]` marker or yields a terminal error.
    ///
    /// # Errors
    /// - [`LlmError::HttpStatus`] / [`LlmError::Transport`] for the initial exchange
    /// - [`LlmError::ContentFiltered`] (mid-stream) when the provider filters the answer
    #[instrument(skip_all, fields(model = %self.cfg.chat_model, turns = history.len()))]
    pub async fn stream_chat(
        &self,
        system: &str,
        history: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<TokenStream, LlmError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
        for turn in history {
            messages.push(WireMessage {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &turn.content,
            });
        }

        let body = ChatCompletionRequest {
            model: &self.cfg.chat_model,
            messages,
            stream: true,
            max_tokens,
        };

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(LlmError::HttpStatus {
                status: resp.status(),
                url: self.url_chat.clone(),
            });
        }

        let state = SseState {
            body: Box::pin(resp.bytes_stream()),
            buf: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(Box::pin(futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    if item.is_err() {
                        st.done = true;
                        st.pending.clear();
                    }
                    return Some((item, st));
                }
                if st.done {
                    return None;
                }
                match st.body.next().await {
                    Some(Ok(bytes)) => {
                        st.buf.push_str(&String::from_utf8_lossy(&bytes));
                        drain_sse_lines(&mut st);
                    }
                    Some(Err(e)) => {
                        st.done = true;
                        return Some((Err(LlmError::Transport(e)), st));
                    }
                    None => {
                        st.done = true;
                        return None;
                    }
                }
            }
        })))
    }
}

/// Parser state for the chunked SSE body.
struct SseState {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buf: String,
    pending: VecDeque<Result<String, LlmError>>,
    done: bool,
}

/// Splits complete `data:` lines out of the buffer and queues their
/// text fragments. Partial lines stay buffered for the next chunk.
fn drain_sse_lines(st: &mut SseState) {
    while let Some(pos) = st.buf.find('\n') {
        let line: String = st.buf.drain(..=pos).collect();
        let line = line.trim_end_matches(['\n', '\r']);

        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            st.done = true;
            return;
        }

        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                let Some(choice) = chunk.choices.into_iter().next() else {
                    continue;
                };
                if choice.finish_reason.as_deref() == Some("content_filter") {
                    st.pending.push_back(Err(LlmError::ContentFiltered));
                    return;
                }
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        st.pending.push_back(Ok(text));
                    }
                }
            }
            Err(e) => {
                st.pending
                    .push_back(Err(LlmError::Decode(format!("bad stream chunk: {e}"))));
                return;
            }
        }
    }
}

/// Reorders the provider's indexed embedding list into input order and
/// checks the batch is complete.
fn parse_embeddings(out: EmbeddingsResponse, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(out.data.len());
    for (fallback_index, item) in out.data.into_iter().enumerate() {
        indexed.push((item.index.unwrap_or(fallback_index), item.embedding));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let vectors: Vec<Vec<f32>> = indexed.into_iter().map(|(_, v)| v).collect();
    if vectors.len() != expected {
        return Err(LlmError::Decode(format!(
            "embedding batch size mismatch: got {}, want {expected}",
            vectors.len()
        )));
    }
    Ok(vectors)
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embeddings_in_index_order() {
        let out: EmbeddingsResponse = serde_json::from_value(serde_json::json!({
            "data": [
                { "index": 1, "embedding": [2.0, 3.0] },
                { "index": 0, "embedding": [0.5, 1.5] }
            ]
        }))
        .expect("fixture");

        let parsed = parse_embeddings(out, 2).expect("parse failed");
        assert_eq!(parsed[0], vec![0.5, 1.5]);
        assert_eq!(parsed[1], vec![2.0, 3.0]);
    }

    #[test]
    fn rejects_incomplete_batches() {
        let out: EmbeddingsResponse = serde_json::from_value(serde_json::json!({
            "data": [ { "index": 0, "embedding": [1.0] } ]
        }))
        .expect("fixture");

        assert!(matches!(parse_embeddings(out, 2), Err(LlmError::Decode(_))));
    }

    #[test]
    fn drains_fragments_and_detects_done() {
        let mut st = SseState {
            body: Box::pin(futures::stream::empty()),
            buf: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        st.buf.push_str(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "\n",
            "data: [DONE]\n",
        ));
        drain_sse_lines(&mut st);

        assert_eq!(st.pending.pop_front().unwrap().unwrap(), "Hel");
        assert_eq!(st.pending.pop_front().unwrap().unwrap(), "lo");
        assert!(st.pending.is_empty());
        assert!(st.done);
    }

    #[test]
    fn surfaces_content_filter_as_error() {
        let mut st = SseState {
            body: Box::pin(futures::stream::empty()),
            buf: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        st.buf
            .push_str("data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n");
        drain_sse_lines(&mut st);

        assert!(matches!(
            st.pending.pop_front(),
            Some(Err(LlmError::ContentFiltered))
        ));
    }

    #[test]
    fn keeps_partial_lines_buffered() {
        let mut st = SseState {
            body: Box::pin(futures::stream::empty()),
            buf: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        st.buf.push_str("data: {\"choices\":[{\"delta\":{\"co");
        drain_sse_lines(&mut st);
        assert!(st.pending.is_empty());

        st.buf.push_str("ntent\":\"Hi\"}}]}\n");
        drain_sse_lines(&mut st);
        assert_eq!(st.pending.pop_front().unwrap().unwrap(), "Hi");
    }
}
