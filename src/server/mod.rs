//! Server Module
//!
//! HTTP API over the query engine. The embedding store is loaded before the
//! server is built and shared read-only by every handler.

mod config;
mod handler;
mod response;

pub use config::Config;
pub use response::{ApiError, FieldError};

use crate::engine::QueryEngine;
use crate::metrics::Metrics;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: QueryEngine,
    pub metrics: Arc<Metrics>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/health", get(handler::health))
        .route("/api/info", get(handler::info))
        .route("/api/stats", get(handler::stats))
        .route("/api/vector", get(handler::vector))
        .route("/api/similar", get(handler::similar))
        .route("/api/arithmetic", get(handler::arithmetic))
        .route("/api/projected", get(handler::projected))
        .route("/api/vocab", get(handler::vocab))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handler::track_metrics,
        ))
        .fallback(handler::not_found)
        .with_state(state)
}

/// semshapes HTTP server
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    /// Create a new server around a ready engine
    pub fn new(config: Config, engine: QueryEngine) -> Self {
        Self {
            config,
            state: AppState {
                engine,
                metrics: Arc::new(Metrics::new()),
            },
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.state.metrics
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr).await?;

        info!("semshapes server listening on {}", addr);

        let metrics = self.state.metrics.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped. {}", metrics.summary());
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
