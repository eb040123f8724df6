//! POST /api/v1/retrieve — ranked passages for a query.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};

use answerer::SearchParams;

use crate::core::app_state::AppState;
use crate::error_handler::{ApiError, ApiResult};
use crate::middleware_layer::request_meta::RequestMeta;
use crate::rate_limit::LimitedEndpoint;
use crate::routes;
use crate::{auth, injection};

use super::retrieve_request::{RetrieveRequest, RetrieveResponse};

/// Handler: POST /api/v1/retrieve
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/v1/retrieve \
///   -H "authorization: Bearer $API_SECRET_TOKEN" \
///   -H 'content-type: application/json' \
///   -d '{"query":"How many vacation days do employees get?","top_k":5}'
/// ```
pub async fn retrieve(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let meta = routes::meta_of(&request);
    let started = Instant::now();
    let outcome = pipeline(&state, &meta, request).await;
    routes::finish(&state, "retrieve", started, &meta, outcome)
}

async fn pipeline(
    state: &AppState,
    meta: &RequestMeta,
    request: Request<Body>,
) -> ApiResult<Response> {
    let (parts, body) = request.into_parts();

    let token = auth::require_token(&parts.headers, &state.config.api_secret_token)?;
    routes::ensure_declared_size(&parts.headers)?;

    let decision = state.rate_limiter.check(LimitedEndpoint::Retrieve, &token);
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let bytes = routes::read_body(body).await?;
    let payload: RetrieveRequest = serde_json::from_slice(&bytes).map_err(|_| {
        ApiError::BadRequest {
            message: "request body is not valid JSON".into(),
        }
    })?;
    let valid = payload
        .validate()
        .map_err(|errors| ApiError::Validation { errors })?;

    if injection::is_suspicious(&valid.query) {
        return Err(ApiError::SuspiciousInput);
    }

    let passages = answerer::search_passages(
        &state.store,
        state.llm.as_ref(),
        &valid.query,
        &SearchParams {
            top_k: valid.top_k,
            min_similarity: valid.min_similarity,
            document_id: valid.document_id,
        },
    )
    .await?;

    let body = RetrieveResponse {
        count: passages.len(),
        results: passages,
        request_id: meta.request_id.clone(),
    };
    let mut response = (StatusCode::OK, Json(body)).into_response();
    routes::rate_limit_headers(&mut response, decision);
    Ok(response)
}
