//! Route Handlers
//!
//! Each handler validates its query parameters, runs the engine and renders
//! the JSON body. Search work runs on the blocking pool so a large
//! vocabulary scan never stalls the reactor.

use axum::extract::{MatchedPath, Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::debug;

use super::response::{
    ApiError, ArithmeticResponse, FieldError, HealthResponse, InfoResponse, MessageResponse,
    ProjectedResponse, SimilarResponse, VectorResponse, VocabResponse,
};
use super::AppState;
use crate::engine::QueryEngine;
use crate::metrics::MetricsSnapshot;
use crate::vector::ProjectionMethod;

type Params = Query<HashMap<String, String>>;

const DEFAULT_VOCAB_LIMIT: usize = 10_000;
const DEFAULT_PROJECTION_DIMENSIONS: usize = 2;

/// Collects every parameter problem so the 422 lists them all at once
struct ParamValidator<'a> {
    params: &'a HashMap<String, String>,
    errors: Vec<FieldError>,
}

impl<'a> ParamValidator<'a> {
    fn new(params: &'a HashMap<String, String>) -> Self {
        Self {
            params,
            errors: Vec::new(),
        }
    }

    fn required(&mut self, name: &str) -> &'a str {
        let params: &'a HashMap<String, String> = self.params;
        match params.get(name) {
            Some(value) => value.as_str(),
            None => {
                self.errors.push(FieldError::missing(name));
                ""
            }
        }
    }

    fn optional(&self, name: &str) -> Option<&'a str> {
        let params: &'a HashMap<String, String> = self.params;
        params.get(name).map(String::as_str)
    }

    fn optional_usize(&mut self, name: &str) -> Option<usize> {
        let params: &'a HashMap<String, String> = self.params;
        let raw = params.get(name)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.push(FieldError::not_an_integer(name, raw));
                None
            }
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Run CPU-bound engine work off the async workers
async fn run_blocking<T, F>(engine: &QueryEngine, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&QueryEngine) -> T + Send + 'static,
{
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || work(&engine))
        .await
        .map_err(|e| ApiError::Internal(format!("Query task failed: {}", e)))
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Semantic Shapes API",
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        vocab_size: state.engine.store().len(),
    })
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let info = state.engine.info();
    Json(InfoResponse {
        model_type: info.model_type.to_string(),
        dimensions: info.dimensions,
        vocab_size: info.vocab_size,
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// `GET /api/arithmetic?expr=..&n=..`
pub async fn arithmetic(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<ArithmeticResponse>, ApiError> {
    let mut validator = ParamValidator::new(&params);
    let expression = validator.required("expr").to_string();
    let n = validator.optional_usize("n");
    validator.finish()?;

    let query = expression.clone();
    let results = run_blocking(&state.engine, move |engine| engine.arithmetic(&query, n))
        .await?
        .map_err(ApiError::from_arithmetic)?;

    Ok(Json(ArithmeticResponse {
        expression,
        results,
    }))
}

/// `GET /api/similar?word=..&n=..`
pub async fn similar(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<SimilarResponse>, ApiError> {
    let mut validator = ParamValidator::new(&params);
    let word = validator.required("word").to_string();
    let n = validator.optional_usize("n");
    validator.finish()?;

    let query = word.clone();
    let similar = run_blocking(&state.engine, move |engine| engine.similar(&query, n))
        .await?
        .map_err(ApiError::from_lookup)?;

    Ok(Json(SimilarResponse { word, similar }))
}

/// `GET /api/vector?word=..`
pub async fn vector(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<VectorResponse>, ApiError> {
    let mut validator = ParamValidator::new(&params);
    let word = validator.required("word");
    validator.finish()?;

    let vector = state
        .engine
        .vector(word)
        .map_err(ApiError::from_lookup)?
        .to_vec();

    Ok(Json(VectorResponse {
        word: word.to_string(),
        vector,
    }))
}

/// `GET /api/projected?words=a,b,c&method=pca&dimensions=2`
pub async fn projected(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<ProjectedResponse>, ApiError> {
    let mut validator = ParamValidator::new(&params);
    let words = validator.required("words");
    let method = validator.optional("method").unwrap_or("pca");
    let dimensions = validator
        .optional_usize("dimensions")
        .unwrap_or(DEFAULT_PROJECTION_DIMENSIONS);
    validator.finish()?;

    let words: Vec<String> = words.split(',').map(|w| w.trim().to_string()).collect();
    let method: ProjectionMethod = method
        .parse()
        .map_err(|e: crate::error::ProjectionError| ApiError::BadRequest(e.to_string()))?;

    let projection = run_blocking(&state.engine, move |engine| {
        engine.project(&words, method, dimensions)
    })
    .await?
    .map_err(ApiError::from_projection)?;

    let coordinates: BTreeMap<String, Vec<f32>> = projection
        .words
        .iter()
        .cloned()
        .zip(projection.coordinates)
        .collect();

    Ok(Json(ProjectedResponse {
        words: projection.words,
        method: projection.method.as_str(),
        dimensions: projection.dimensions,
        coordinates,
    }))
}

/// `GET /api/vocab?limit=..&starts_with=..`
pub async fn vocab(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<VocabResponse>, ApiError> {
    let mut validator = ParamValidator::new(&params);
    let limit = validator.optional_usize("limit").unwrap_or(DEFAULT_VOCAB_LIMIT);
    let starts_with = validator.optional("starts_with");
    validator.finish()?;

    let words = state.engine.vocabulary(limit, starts_with);
    Ok(Json(VocabResponse {
        count: words.len(),
        words,
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

/// Records per-route latency and error counts
pub async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status();
    state
        .metrics
        .record_request(&route, elapsed, !status.is_success());
    debug!(route = %route, status = status.as_u16(), latency = ?elapsed, "Request handled");

    response
}
