//! AnalyticsService
//!
//! Endpoints:
//! - POST /progress.AnalyticsService/GetAnalytics

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use progress_core::analytics::ProgressAnalytics;
use progress_core::UserId;

use super::ApiState;
use crate::error::ServiceResult;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/progress.AnalyticsService/GetAnalytics", post(get_analytics))
}

#[derive(Deserialize)]
pub struct AnalyticsRequest {
    pub user_id: UserId,
}

async fn get_analytics(
    State(state): State<ApiState>,
    Json(req): Json<AnalyticsRequest>,
) -> ServiceResult<Json<ProgressAnalytics>> {
    let analytics = state
        .services
        .progress
        .compute_analytics(req.user_id)
        .await?;
    Ok(Json(analytics))
}
