//! Shared helpers for the HTTP harnesses.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use semshapes::server::router;
use semshapes::vector::demo_store;
use semshapes::{AppState, EngineOptions, Metrics, QueryEngine};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router over the built-in demo vocabulary
pub fn demo_app() -> Router {
    demo_app_with(EngineOptions::default())
}

pub fn demo_app_with(options: EngineOptions) -> Router {
    let store = Arc::new(demo_store().expect("demo store must build"));
    router(AppState {
        engine: QueryEngine::new(store, options),
        metrics: Arc::new(Metrics::new()),
    })
}

/// Issue a GET and decode the JSON body
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// The word column of a `results` / `similar` array
pub fn words(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["word"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
