//! HTTP API integration harness.
//!
//! Drives the axum router in-process over the demo vocabulary and checks the
//! wire contract the browser UI depends on:
//!
//! - `GET /api/arithmetic?expr=..` returns `{"results": [{word, similarity}]}`
//!   ranked by similarity, never containing an expression word.
//! - Failures carry `{"detail": "<message>"}` (400/404) or
//!   `{"detail": [{"msg": ..}, ..]}` (422).
//!
//! ```sh
//! cargo test --test api_harness
//! ```

mod common;

use axum::http::StatusCode;
use common::*;
use pretty_assertions::assert_eq;
use semshapes::{EngineOptions, MissingSignPolicy};
use serde_json::json;

// ---------------------------------------------------------------------------
// /api/arithmetic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn arithmetic_king_man_woman_returns_queen_first() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=king%20-%20man%20%2B%20woman").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expression"], "king - man + woman");
    let results = &body["results"];
    assert_eq!(words(results)[0], "queen");
    assert!((results[0]["similarity"].as_f64().unwrap() - 1.0).abs() < 1e-5);
    assert_eq!(results.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn arithmetic_form_encoded_spaces_decode() {
    // A bare `+` in a query string is a space; the operator must be `%2B`
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=king+%2B+man").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expression"], "king + man");
}

#[tokio::test]
async fn arithmetic_results_exclude_inputs_and_are_sorted() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=prince%20-%20boy%20%2B%20girl&n=30").await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 20);
    let listed = words(&body["results"]);
    for input in ["prince", "boy", "girl"] {
        assert!(!listed.contains(&input.to_string()), "{} leaked into results", input);
    }
    assert_eq!(listed[0], "princess");

    let sims: Vec<f64> = results.iter().map(|r| r["similarity"].as_f64().unwrap()).collect();
    assert!(sims.windows(2).all(|w| w[0] >= w[1]));
    assert!(sims.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[tokio::test]
async fn arithmetic_is_repeatable() {
    let app = demo_app();
    let (_, first) = get_json(&app, "/api/arithmetic?expr=dog%20%2B%20computer&n=10").await;
    let (_, second) = get_json(&app, "/api/arithmetic?expr=dog%20%2B%20computer&n=10").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn arithmetic_dangling_sign_is_bad_request() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=%2B").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Dangling sign"));
}

#[tokio::test]
async fn arithmetic_unknown_word_is_named() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=banana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Word 'banana' not in vocabulary" }));
}

#[tokio::test]
async fn arithmetic_blank_expression_is_empty_error() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?expr=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Expression is empty" }));
}

#[tokio::test]
async fn arithmetic_missing_sign_rejected_when_configured() {
    let app = demo_app_with(EngineOptions::default().with_missing_sign(MissingSignPolicy::Reject));
    let (status, body) = get_json(&app, "/api/arithmetic?expr=king%20queen").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Missing '+' or '-'"));
}

#[tokio::test]
async fn arithmetic_missing_params_are_unprocessable() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/arithmetic?n=abc").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let detail = body["detail"].as_array().unwrap();
    assert_eq!(detail.len(), 2);
    assert_eq!(detail[0]["msg"], "Field required");
    assert_eq!(detail[0]["loc"], json!(["query", "expr"]));
    assert_eq!(detail[1]["loc"], json!(["query", "n"]));
}

// ---------------------------------------------------------------------------
// Supplementary endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_and_health() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Welcome to the Semantic Shapes API" }));

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "vocab_size": 23 }));
}

#[tokio::test]
async fn info_reports_model_shape() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "model_type": "in-memory", "dimensions": 13, "vocab_size": 23 })
    );
}

#[tokio::test]
async fn vector_lookup() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/vector?word=Dog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["word"], "Dog");
    assert_eq!(body["vector"].as_array().unwrap().len(), 13);

    let (status, body) = get_json(&app, "/api/vector?word=zebra").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Word 'zebra' not found in vocabulary" }));
}

#[tokio::test]
async fn similar_words() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/similar?word=keyboard&n=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["word"], "keyboard");
    let similar = words(&body["similar"]);
    assert_eq!(similar.len(), 3);
    assert_eq!(similar[0], "computer");
    assert!(!similar.contains(&"keyboard".to_string()));

    let (status, _) = get_json(&app, "/api/similar?word=zebra").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn projected_coordinates() {
    let app = demo_app();
    let (status, body) =
        get_json(&app, "/api/projected?words=king,%20queen,man,woman&dimensions=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["words"], json!(["king", "queen", "man", "woman"]));
    assert_eq!(body["method"], "pca");
    assert_eq!(body["dimensions"], 3);
    assert_eq!(body["coordinates"]["queen"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn projected_tsne_coordinates() {
    let app = demo_app();
    let uri = "/api/projected?words=king,queen,man,woman,dog,cat&method=TSNE";
    let (status, body) = get_json(&app, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "tsne");
    assert_eq!(body["dimensions"], 2);
    assert_eq!(body["coordinates"]["cat"].as_array().unwrap().len(), 2);

    let (_, again) = get_json(&app, uri).await;
    assert_eq!(body, again);
}

#[tokio::test]
async fn projected_errors() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/projected?words=king,zebra,yak").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Words not found in vocabulary: zebra, yak" }));

    let (status, body) = get_json(&app, "/api/projected?words=king,queen&method=umap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Method must be 'pca' or 'tsne'" }));

    let (status, _) = get_json(&app, "/api/projected?words=king,queen&dimensions=4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vocab_listing() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/vocab?starts_with=pr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "count": 2, "words": ["prince", "princess"] }));

    let (_, body) = get_json(&app, "/api/vocab?limit=3").await;
    assert_eq!(body["words"], json!(["king", "queen", "man"]));
}

#[tokio::test]
async fn unknown_route_uses_detail_contract() {
    let app = demo_app();
    let (status, body) = get_json(&app, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not Found" }));
}
