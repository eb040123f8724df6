//! Request/response DTOs for `POST /api/v1/chat`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use answerer::RetrievedPassage;
use llm_service::{ChatMessage, ChatRole};

use crate::error_handler::FieldIssue;

pub const MAX_MESSAGES: usize = 50;
pub const MAX_CONTENT_CHARS: usize = 500;
pub const MAX_OUTPUT_TOKENS: i64 = 2000;
pub const DEFAULT_OUTPUT_TOKENS: u32 = 800;

/// Raw chat body. Unknown fields are ignored; bounds are checked in
/// [`ChatRequest::validate`].
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<IncomingMessage>>,
    pub max_output_tokens: Option<i64>,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Validated chat parameters with defaults applied.
#[derive(Clone, Debug)]
pub struct ValidChat {
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: u32,
    /// Reserved for response localization; accepted and unused.
    pub locale: String,
}

impl ChatRequest {
    /// Checks the schema bounds, collecting every field issue.
    pub fn validate(self) -> Result<ValidChat, Vec<FieldIssue>> {
        let mut issues = Vec::new();

        let incoming = self.messages.unwrap_or_default();
        if incoming.is_empty() || incoming.len() > MAX_MESSAGES {
            issues.push(FieldIssue::new(
                "messages",
                format!("required, 1..{MAX_MESSAGES} items"),
            ));
        }

        let mut messages = Vec::with_capacity(incoming.len());
        for (i, msg) in incoming.iter().enumerate() {
            let role = match msg.role.as_deref() {
                Some("user") => Some(ChatRole::User),
                Some("assistant") => Some(ChatRole::Assistant),
                Some("system") => {
                    issues.push(FieldIssue::new(
                        format!("messages[{i}].role"),
                        "system role is not accepted from clients",
                    ));
                    None
                }
                _ => {
                    issues.push(FieldIssue::new(
                        format!("messages[{i}].role"),
                        "must be \"user\" or \"assistant\"",
                    ));
                    None
                }
            };

            let content = msg.content.clone().unwrap_or_default();
            let content_chars = content.chars().count();
            if content_chars == 0 || content_chars > MAX_CONTENT_CHARS {
                issues.push(FieldIssue::new(
                    format!("messages[{i}].content"),
                    format!("required, 1..{MAX_CONTENT_CHARS} characters"),
                ));
            }

            if let Some(role) = role {
                messages.push(ChatMessage { role, content });
            }
        }

        if let Some(last) = incoming.last() {
            if last.role.as_deref() != Some("user") {
                issues.push(FieldIssue::new(
                    "messages",
                    "last message must have role \"user\"",
                ));
            }
        }

        let max_output_tokens = self
            .max_output_tokens
            .unwrap_or(i64::from(DEFAULT_OUTPUT_TOKENS));
        if !(1..=MAX_OUTPUT_TOKENS).contains(&max_output_tokens) {
            issues.push(FieldIssue::new(
                "max_output_tokens",
                format!("must be in 1..{MAX_OUTPUT_TOKENS}"),
            ));
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(ValidChat {
            messages,
            max_output_tokens: max_output_tokens as u32,
            locale: self.locale.unwrap_or_else(|| "en".to_string()),
        })
    }
}

/// Debug-mode chat body: the full answer plus retrieval artifacts.
#[derive(Debug, Serialize)]
pub struct ChatDebugResponse {
    pub answer: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub retrieved_docs: Vec<RetrievedDoc>,
}

#[derive(Debug, Serialize)]
pub struct RetrievedDoc {
    pub chunk_id: Uuid,
    pub content: String,
    pub similarity: f32,
    pub source_file: Option<String>,
    pub document_title: Option<String>,
}

impl From<RetrievedPassage> for RetrievedDoc {
    fn from(p: RetrievedPassage) -> Self {
        Self {
            chunk_id: p.chunk_id,
            content: p.content,
            similarity: p.similarity,
            source_file: p.source_file,
            document_title: p.document_title,
        }
    }
}
