//! HTTP Response Types
//!
//! JSON bodies of every endpoint, and the `{"detail": ...}` error contract.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::error::{EvaluationError, ProjectionError, QueryError};
use crate::vector::Neighbor;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub vocab_size: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub model_type: String,
    pub dimensions: usize,
    pub vocab_size: usize,
}

#[derive(Debug, Serialize)]
pub struct ArithmeticResponse {
    pub expression: String,
    pub results: Vec<Neighbor>,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub word: String,
    pub similar: Vec<Neighbor>,
}

#[derive(Debug, Serialize)]
pub struct VectorResponse {
    pub word: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct ProjectedResponse {
    pub words: Vec<String>,
    pub method: &'static str,
    pub dimensions: usize,
    pub coordinates: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct VocabResponse {
    pub count: usize,
    pub words: Vec<String>,
}

/// One entry of a 422 `detail` array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub loc: Vec<String>,
    pub msg: String,
    pub input: Option<String>,
}

impl FieldError {
    pub fn missing(param: &str) -> Self {
        Self {
            kind: "missing",
            loc: vec!["query".to_string(), param.to_string()],
            msg: "Field required".to_string(),
            input: None,
        }
    }

    pub fn not_an_integer(param: &str, input: &str) -> Self {
        Self {
            kind: "int_parsing",
            loc: vec!["query".to_string(), param.to_string()],
            msg: "Input should be a valid integer, unable to parse string as an integer".to_string(),
            input: Some(input.to_string()),
        }
    }
}

/// Error returned by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 400 with a string detail
    BadRequest(String),
    /// 404 with a string detail
    NotFound(String),
    /// 422 with an array detail
    Validation(Vec<FieldError>),
    /// 500 with a string detail
    Internal(String),
}

impl ApiError {
    /// Mapping used by `/api/arithmetic`: every pipeline failure is a 400
    pub fn from_arithmetic(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }

    /// Mapping used by single-word lookups: an unknown word is a 404
    pub fn from_lookup(err: QueryError) -> Self {
        match err {
            QueryError::Evaluation(EvaluationError::UnknownWord(word)) => {
                ApiError::NotFound(format!("Word '{}' not found in vocabulary", word))
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }

    /// Mapping used by `/api/projected`
    pub fn from_projection(err: QueryError) -> Self {
        match err {
            QueryError::Projection(unknown @ ProjectionError::UnknownWords(_)) => {
                ApiError::NotFound(unknown.to_string())
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(detail) | ApiError::NotFound(detail) | ApiError::Internal(detail) => {
                json!({ "detail": detail })
            }
            ApiError::Validation(errors) => json!({ "detail": errors }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_arithmetic_mapping_is_bad_request() {
        let err = ApiError::from_arithmetic(EvaluationError::UnknownWord("banana".into()).into());
        assert_eq!(err, ApiError::BadRequest("Word 'banana' not in vocabulary".into()));

        let err = ApiError::from_arithmetic(ParseError::Empty.into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_lookup_mapping_is_not_found() {
        let err = ApiError::from_lookup(EvaluationError::UnknownWord("zzz".into()).into());
        assert_eq!(err, ApiError::NotFound("Word 'zzz' not found in vocabulary".into()));
    }

    #[test]
    fn test_projection_mapping() {
        let err = ApiError::from_projection(ProjectionError::UnknownWords(vec!["a".into()]).into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = ApiError::from_projection(ProjectionError::InvalidDimensions(5).into());
        assert_eq!(err, ApiError::BadRequest("Dimensions must be 2 or 3".into()));
    }

    #[test]
    fn test_field_error_shape() {
        let value = serde_json::to_value(FieldError::missing("expr")).unwrap();
        assert_eq!(value["type"], "missing");
        assert_eq!(value["loc"], json!(["query", "expr"]));
        assert_eq!(value["msg"], "Field required");
    }
}
