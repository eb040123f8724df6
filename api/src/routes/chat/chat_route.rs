//! POST /api/v1/chat — grounded answer, streamed or as debug JSON.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use llm_service::ChatRole;

use crate::core::app_state::AppState;
use crate::error_handler::{ApiError, ApiResult};
use crate::middleware_layer::request_meta::RequestMeta;
use crate::rate_limit::LimitedEndpoint;
use crate::routes;
use crate::{auth, injection};

use super::chat_request::{ChatDebugResponse, ChatRequest, RetrievedDoc};

/// Handler: POST /api/v1/chat[?debug=1]
///
/// Non-debug responses are a server-sent event stream of incremental
/// answer fragments terminated by a `[DONE]` marker. With `debug=1`
/// the full answer and the retrieval artifacts come back as one JSON
/// body.
pub async fn chat(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let meta = routes::meta_of(&request);
    let started = Instant::now();
    let outcome = pipeline(&state, &meta, request).await;
    routes::finish(&state, "chat", started, &meta, outcome)
}

async fn pipeline(
    state: &AppState,
    meta: &RequestMeta,
    request: Request<Body>,
) -> ApiResult<Response> {
    let (parts, body) = request.into_parts();
    let debug_mode = parts.uri.query().map(is_debug_query).unwrap_or(false);

    let token = auth::require_token(&parts.headers, &state.config.api_secret_token)?;
    routes::ensure_declared_size(&parts.headers)?;

    let decision = state.rate_limiter.check(LimitedEndpoint::Chat, &token);
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let bytes = routes::read_body(body).await?;
    let payload: ChatRequest = serde_json::from_slice(&bytes).map_err(|_| {
        ApiError::BadRequest {
            message: "request body is not valid JSON".into(),
        }
    })?;
    let valid = payload
        .validate()
        .map_err(|errors| ApiError::Validation { errors })?;

    let user_text_suspicious = valid
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .any(|m| injection::is_suspicious(&m.content));
    if user_text_suspicious {
        return Err(ApiError::SuspiciousInput);
    }

    let turn = answerer::start_chat(
        &state.store,
        state.llm.as_ref(),
        &state.llm,
        &valid.messages,
        valid.max_output_tokens,
    )
    .await?;

    let mut response = if debug_mode {
        let answer = answerer::collect_answer(turn.tokens).await?;
        let body = ChatDebugResponse {
            answer,
            request_id: meta.request_id.clone(),
            retrieved_docs: turn.passages.into_iter().map(RetrievedDoc::from).collect(),
        };
        (StatusCode::OK, Json(body)).into_response()
    } else {
        let request_id = meta.request_id.clone();
        let events = turn
            .tokens
            .map(move |item| match item {
                Ok(fragment) => Event::default().data(fragment),
                Err(err) => {
                    let mapped = ApiError::from(err);
                    mapped.log(&request_id);
                    Event::default().event("error").data(mapped.error_code())
                }
            })
            .chain(futures::stream::once(async {
                Event::default().data("[DONE]")
            }))
            .map(Ok::<_, Infallible>);
        Sse::new(events).into_response()
    };

    routes::rate_limit_headers(&mut response, decision);
    Ok(response)
}

fn is_debug_query(query: &str) -> bool {
    query
        .split('&')
        .any(|kv| kv == "debug=1" || kv == "debug=true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_parsing() {
        assert!(is_debug_query("debug=1"));
        assert!(is_debug_query("foo=bar&debug=true"));
        assert!(!is_debug_query("debug=0"));
        assert!(!is_debug_query("verbose=1"));
    }
}
