//! HTTP/JSON API Layer
//!
//! JSON-over-HTTP endpoints following gRPC path conventions:
//! `POST /progress.<Service>/<Method>`, e.g.
//! `POST /progress.LessonService/CompleteLesson`.
//!
//! ## Architecture
//! ```text
//! Learning app (JSON over HTTP)
//!       ↓
//! Axum Router
//!       ↓
//! Handlers (lesson, gamification, analytics)
//!       ↓
//! Services → StorageManager
//! ```

pub mod analytics;
pub mod gamification;
pub mod lesson;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metrics::ServerMetrics;
use crate::services::Services;

/// Shared state available to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub services: Services,
    pub metrics: Arc<ServerMetrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full API router with all service endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(crate::metrics::prometheus_handler))
        .route("/metrics/json", get(crate::metrics::json_metrics_handler))
        .merge(lesson::routes())
        .merge(gamification::routes())
        .merge(analytics::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on the given port until the process is stopped
pub async fn start_api_server(
    state: ApiState,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
