//! Server Metrics - request and learning-activity counters with Prometheus + JSON export
//!
//! All counters are lock-free atomics.
//!
//! ## Endpoints
//! - `GET /metrics` - Prometheus text format
//! - `GET /metrics/json` - JSON format

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::api::ApiState;

#[derive(Debug)]
pub struct ServerMetrics {
    pub total_requests: AtomicU64,
    /// 4xx + 5xx
    pub total_errors: AtomicU64,
    /// Cumulative request duration in microseconds
    pub total_duration_us: AtomicU64,
    pub lessons_completed: AtomicU64,
    pub points_awarded: AtomicU64,
    /// Best-effort lesson completion steps that failed
    pub step_failures: AtomicU64,
    pub start_time: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_duration_us: AtomicU64::new(0),
            lessons_completed: AtomicU64::new(0),
            points_awarded: AtomicU64::new(0),
            step_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, duration_us: u64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us.fetch_add(duration_us, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_lesson_completed(&self) {
        self.lessons_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_points(&self, points: u64) {
        self.points_awarded.fetch_add(points, Ordering::Relaxed);
    }

    pub fn record_step_failure(&self) {
        self.step_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn requests_per_second(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed) as f64;
        let uptime = self.uptime_secs();
        if uptime > 0.0 { total / uptime } else { 0.0 }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        let dur_us = self.total_duration_us.load(Ordering::Relaxed);
        if total > 0 {
            (dur_us as f64 / total as f64) / 1000.0
        } else {
            0.0
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Records count and duration for every HTTP request
pub async fn metrics_middleware(
    State(state): State<ApiState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let resp = next.run(req).await;
    let duration_us = start.elapsed().as_micros() as u64;
    let is_error = resp.status().is_client_error() || resp.status().is_server_error();

    state.metrics.record_request(duration_us, is_error);
    resp
}

// ============================================================================
// GET /metrics
// ============================================================================

pub async fn prometheus_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let m = &state.metrics;
    let total_requests = m.total_requests.load(Ordering::Relaxed);
    let total_errors = m.total_errors.load(Ordering::Relaxed);
    let lessons = m.lessons_completed.load(Ordering::Relaxed);
    let points = m.points_awarded.load(Ordering::Relaxed);
    let step_failures = m.step_failures.load(Ordering::Relaxed);
    let avg_req_duration_s = m.avg_duration_ms() / 1000.0;
    let rps = m.requests_per_second();
    let uptime = m.uptime_secs();

    let body = format!(
        "# HELP progress_requests_total Total HTTP requests served\n\
         # TYPE progress_requests_total counter\n\
         progress_requests_total {total_requests}\n\
         \n\
         # HELP progress_request_errors_total Total HTTP request errors (4xx/5xx)\n\
         # TYPE progress_request_errors_total counter\n\
         progress_request_errors_total {total_errors}\n\
         \n\
         # HELP progress_request_duration_seconds Average request duration\n\
         # TYPE progress_request_duration_seconds gauge\n\
         progress_request_duration_seconds {avg_req_duration_s:.6}\n\
         \n\
         # HELP progress_requests_per_second Current request throughput\n\
         # TYPE progress_requests_per_second gauge\n\
         progress_requests_per_second {rps:.2}\n\
         \n\
         # HELP progress_lessons_completed_total Lessons completed\n\
         # TYPE progress_lessons_completed_total counter\n\
         progress_lessons_completed_total {lessons}\n\
         \n\
         # HELP progress_points_awarded_total Points awarded for lesson completions\n\
         # TYPE progress_points_awarded_total counter\n\
         progress_points_awarded_total {points}\n\
         \n\
         # HELP progress_completion_step_failures_total Failed best-effort completion steps\n\
         # TYPE progress_completion_step_failures_total counter\n\
         progress_completion_step_failures_total {step_failures}\n\
         \n\
         # HELP progress_uptime_seconds Server uptime\n\
         # TYPE progress_uptime_seconds gauge\n\
         progress_uptime_seconds {uptime:.2}\n",
    );

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

// ============================================================================
// GET /metrics/json
// ============================================================================

#[derive(Serialize)]
pub struct JsonMetrics {
    pub uptime_secs: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub rps: f64,
    pub avg_request_duration_ms: f64,
    pub lessons_completed: u64,
    pub points_awarded: u64,
    pub step_failures: u64,
}

pub async fn json_metrics_handler(State(state): State<ApiState>) -> Json<JsonMetrics> {
    let m = &state.metrics;
    Json(JsonMetrics {
        uptime_secs: m.uptime_secs(),
        total_requests: m.total_requests.load(Ordering::Relaxed),
        total_errors: m.total_errors.load(Ordering::Relaxed),
        rps: m.requests_per_second(),
        avg_request_duration_ms: m.avg_duration_ms(),
        lessons_completed: m.lessons_completed.load(Ordering::Relaxed),
        points_awarded: m.points_awarded.load(Ordering::Relaxed),
        step_failures: m.step_failures.load(Ordering::Relaxed),
    })
}
