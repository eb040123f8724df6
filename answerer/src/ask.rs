//! Chat orchestration: retrieval, prompt assembly, streaming answer.

use std::pin::Pin;

use futures::stream::{Stream, StreamExt};
use tracing::{debug, info};

use kb_store::KbStore;
use llm_service::{ChatMessage, LlmClient};

use crate::api_types::RetrievedPassage;
use crate::embed::Embedder;
use crate::error::AnswerError;
use crate::prompt::build_system_text;
use crate::retrieve::{SearchParams, search_passages};
use crate::timeouts::{self, bounded};

/// Candidate count for chat-internal retrieval.
pub const CHAT_TOP_K: u32 = 5;
/// Chat-internal similarity floor. Deliberately below the retrieval
/// endpoint's default so the model has weak evidence to cite or refuse
/// from instead of none.
pub const CHAT_MIN_SIMILARITY: f32 = 0.3;

/// Ordered stream of answer fragments with pipeline-level errors.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String, AnswerError>> + Send>>;

/// Output of a started chat turn: the evidence that grounded the prompt
/// plus the live token stream.
pub struct ChatTurnOutput {
    pub passages: Vec<RetrievedPassage>,
    pub tokens: AnswerStream,
}

/// Runs the chat pipeline up to the first token.
///
/// The *last* message (validated upstream to be a user turn) is the
/// retrieval query; earlier messages reach the model as history only.
/// The returned stream enforces the idle bound between fragments and
/// cancels the provider call when dropped.
///
/// # Errors
/// Retrieval errors as in [`search_passages`]; [`AnswerError::Llm`]
/// when the completion cannot be started; [`AnswerError::Timeout`]
/// when a bound expires.
pub async fn start_chat(
    store: &KbStore,
    embedder: &dyn Embedder,
    llm: &LlmClient,
    history: &[ChatMessage],
    max_output_tokens: u32,
) -> Result<ChatTurnOutput, AnswerError> {
    let query = history.last().map(|m| m.content.as_str()).unwrap_or("");
    info!(turns = history.len(), "starting chat turn");

    let passages = search_passages(
        store,
        embedder,
        query,
        &SearchParams {
            top_k: CHAT_TOP_K,
            min_similarity: CHAT_MIN_SIMILARITY,
            document_id: None,
        },
    )
    .await?;
    debug!(passages = passages.len(), "chat retrieval completed");

    let system = build_system_text(&passages);
    let tokens = bounded(
        "completion start",
        timeouts::LLM_STREAM_IDLE,
        llm.stream_chat(&system, history, max_output_tokens),
    )
    .await?
    .map_err(AnswerError::Llm)?;

    Ok(ChatTurnOutput {
        passages,
        tokens: idle_bounded(tokens),
    })
}

/// Collects a full answer from the stream under the completion bound.
/// Used by debug mode, which materializes the answer as JSON.
///
/// # Errors
/// Propagates stream errors; [`AnswerError::Timeout`] if the whole
/// collection exceeds the completion bound.
pub async fn collect_answer(mut tokens: AnswerStream) -> Result<String, AnswerError> {
    bounded("completion", timeouts::LLM_COMPLETION, async move {
        let mut full = String::new();
        while let Some(item) = tokens.next().await {
            full.push_str(&item?);
        }
        Ok(full)
    })
    .await?
}

/// Wraps a provider token stream with the idle bound: a gap longer than
/// the streaming-idle limit yields a terminal timeout item.
fn idle_bounded(tokens: llm_service::TokenStream) -> AnswerStream {
    Box::pin(futures::stream::unfold(
        (tokens, false),
        |(mut inner, done)| async move {
            if done {
                return None;
            }
            match tokio::time::timeout(timeouts::LLM_STREAM_IDLE, inner.next()).await {
                Ok(Some(Ok(fragment))) => Some((Ok(fragment), (inner, false))),
                Ok(Some(Err(e))) => Some((Err(AnswerError::Llm(e)), (inner, true))),
                Ok(None) => None,
                Err(_) => Some((
                    Err(AnswerError::Timeout {
                        operation: "model stream",
                        limit_secs: timeouts::LLM_STREAM_IDLE.as_secs(),
                    }),
                    (inner, true),
                )),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_service::LlmError;

    fn provider_stream(
        items: Vec<Result<String, LlmError>>,
    ) -> llm_service::TokenStream {
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn collect_concatenates_fragments_in_order() {
        let tokens = idle_bounded(provider_stream(vec![
            Ok("You ".into()),
            Ok("get ".into()),
            Ok("25 days.".into()),
        ]));

        let answer = collect_answer(tokens).await.unwrap();
        assert_eq!(answer, "You get 25 days.");
    }

    #[tokio::test]
    async fn provider_error_terminates_the_stream() {
        let mut tokens = idle_bounded(provider_stream(vec![
            Ok("partial".into()),
            Err(LlmError::ContentFiltered),
            Ok("never delivered".into()),
        ]));

        assert_eq!(tokens.next().await.unwrap().unwrap(), "partial");
        let err = tokens.next().await.unwrap().unwrap_err();
        assert!(err.is_content_filtered());
        assert!(tokens.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_surfaces_content_filter() {
        let tokens = idle_bounded(provider_stream(vec![Err(LlmError::ContentFiltered)]));
        let err = collect_answer(tokens).await.unwrap_err();
        assert!(err.is_content_filtered());
    }
}
