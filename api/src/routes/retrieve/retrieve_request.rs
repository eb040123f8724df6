//! Request/response DTOs for `POST /api/v1/retrieve`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use answerer::RetrievedPassage;

use crate::error_handler::FieldIssue;

pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_TOP_K: i64 = 50;
pub const DEFAULT_TOP_K: u32 = 8;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Raw retrieval body. Unknown fields are ignored; bounds are checked
/// in [`RetrieveRequest::validate`].
#[derive(Debug, Default, Deserialize)]
pub struct RetrieveRequest {
    pub query: Option<String>,
    pub top_k: Option<i64>,
    pub min_similarity: Option<f64>,
    #[serde(default)]
    pub filters: Option<RetrieveFilters>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrieveFilters {
    pub document_id: Option<String>,
}

/// Validated retrieval parameters with defaults applied.
#[derive(Clone, Debug)]
pub struct ValidRetrieve {
    pub query: String,
    pub top_k: u32,
    pub min_similarity: f32,
    pub document_id: Option<Uuid>,
}

impl RetrieveRequest {
    /// Checks the schema bounds, collecting every field issue.
    pub fn validate(self) -> Result<ValidRetrieve, Vec<FieldIssue>> {
        let mut issues = Vec::new();

        let query = self.query.unwrap_or_default();
        let query_chars = query.chars().count();
        if query_chars == 0 || query_chars > MAX_QUERY_CHARS {
            issues.push(FieldIssue::new(
                "query",
                format!("required, 1..{MAX_QUERY_CHARS} characters"),
            ));
        }

        let top_k = self.top_k.unwrap_or(i64::from(DEFAULT_TOP_K));
        if !(1..=MAX_TOP_K).contains(&top_k) {
            issues.push(FieldIssue::new("top_k", format!("must be in 1..{MAX_TOP_K}")));
        }

        let min_similarity = self.min_similarity.unwrap_or(f64::from(DEFAULT_MIN_SIMILARITY));
        if !(0.0..=1.0).contains(&min_similarity) {
            issues.push(FieldIssue::new(
                "min_similarity",
                "must be a number in [0, 1]",
            ));
        }

        let document_id = match self.filters.and_then(|f| f.document_id) {
            Some(raw) => match Uuid::parse_str(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    issues.push(FieldIssue::new("filters.document_id", "must be a UUID"));
                    None
                }
            },
            None => None,
        };

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(ValidRetrieve {
            query,
            top_k: top_k as u32,
            min_similarity: min_similarity as f32,
            document_id,
        })
    }
}

/// Successful retrieval body.
#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievedPassage>,
    pub count: usize,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let valid = RetrieveRequest {
            query: Some("vacation days".into()),
            ..Default::default()
        }
        .validate()
        .expect("valid");

        assert_eq!(valid.top_k, DEFAULT_TOP_K);
        assert_eq!(valid.min_similarity, DEFAULT_MIN_SIMILARITY);
        assert!(valid.document_id.is_none());
    }

    #[test]
    fn empty_and_oversized_queries_are_rejected() {
        assert!(RetrieveRequest::default().validate().is_err());

        let issues = RetrieveRequest {
            query: Some("x".repeat(MAX_QUERY_CHARS + 1)),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(issues.iter().any(|i| i.path == "query"));
    }

    #[test]
    fn bounds_are_enforced() {
        let issues = RetrieveRequest {
            query: Some("q".into()),
            top_k: Some(0),
            min_similarity: Some(1.5),
            filters: Some(RetrieveFilters {
                document_id: Some("not-a-uuid".into()),
            }),
        }
        .validate()
        .unwrap_err();

        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"top_k"));
        assert!(paths.contains(&"min_similarity"));
        assert!(paths.contains(&"filters.document_id"));
    }

    #[test]
    fn valid_filter_parses() {
        let id = Uuid::new_v4();
        let valid = RetrieveRequest {
            query: Some("q".into()),
            top_k: Some(5),
            min_similarity: Some(0.7),
            filters: Some(RetrieveFilters {
                document_id: Some(id.to_string()),
            }),
        }
        .validate()
        .expect("valid");

        assert_eq!(valid.document_id, Some(id));
        assert_eq!(valid.top_k, 5);
    }
}
