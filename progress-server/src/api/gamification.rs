//! GamificationService - stats, challenges, achievements and milestones
//!
//! Endpoints:
//! - POST /progress.GamificationService/GetStats
//! - POST /progress.GamificationService/CompleteChallenge
//! - POST /progress.GamificationService/ListAchievements
//! - POST /progress.GamificationService/ClaimAchievement
//! - POST /progress.GamificationService/ClaimMilestone

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use progress_core::points::streak_multiplier;
use progress_core::{ActivityResult, DailyChallenge, GamificationStats, UserId};

use super::ApiState;
use crate::error::ServiceResult;
use crate::services::gamification::AchievementOverview;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/progress.GamificationService/GetStats", post(get_stats))
        .route(
            "/progress.GamificationService/CompleteChallenge",
            post(complete_challenge),
        )
        .route(
            "/progress.GamificationService/ListAchievements",
            post(list_achievements),
        )
        .route(
            "/progress.GamificationService/ClaimAchievement",
            post(claim_achievement),
        )
        .route(
            "/progress.GamificationService/ClaimMilestone",
            post(claim_milestone),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct UserRequest {
    pub user_id: UserId,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: GamificationStats,
    pub available_shields: u32,
    pub streak_multiplier: f64,
    pub today_challenge: Option<DailyChallenge>,
}

#[derive(Deserialize)]
pub struct CompleteChallengeRequest {
    pub user_id: UserId,
    pub challenge_id: i64,
    #[serde(default)]
    pub performance: serde_json::Value,
}

#[derive(Deserialize)]
pub struct ClaimAchievementRequest {
    pub user_id: UserId,
    pub achievement_id: i64,
}

#[derive(Serialize)]
pub struct ClaimAchievementResponse {
    pub claimed: bool,
}

#[derive(Deserialize)]
pub struct ClaimMilestoneRequest {
    pub user_id: UserId,
    pub milestone_id: i64,
}

#[derive(Serialize)]
pub struct ClaimMilestoneResponse {
    pub total_points: u64,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_stats(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> ServiceResult<Json<StatsResponse>> {
    let gamification = &state.services.gamification;
    let (stats, today_challenge) = tokio::try_join!(
        gamification.get_or_create_stats(req.user_id),
        gamification.today_challenge(),
    )?;
    Ok(Json(StatsResponse {
        available_shields: stats.available_shields(),
        streak_multiplier: streak_multiplier(stats.current_streak),
        stats,
        today_challenge,
    }))
}

async fn complete_challenge(
    State(state): State<ApiState>,
    Json(req): Json<CompleteChallengeRequest>,
) -> ServiceResult<Json<ActivityResult>> {
    let result = state
        .services
        .gamification
        .complete_daily_challenge(req.user_id, req.challenge_id, req.performance)
        .await?;
    Ok(Json(result))
}

async fn list_achievements(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> ServiceResult<Json<AchievementOverview>> {
    let overview = state
        .services
        .gamification
        .list_user_achievements(req.user_id)
        .await?;
    Ok(Json(overview))
}

async fn claim_achievement(
    State(state): State<ApiState>,
    Json(req): Json<ClaimAchievementRequest>,
) -> ServiceResult<Json<ClaimAchievementResponse>> {
    state
        .services
        .gamification
        .claim_achievement(req.user_id, req.achievement_id)
        .await?;
    Ok(Json(ClaimAchievementResponse { claimed: true }))
}

async fn claim_milestone(
    State(state): State<ApiState>,
    Json(req): Json<ClaimMilestoneRequest>,
) -> ServiceResult<Json<ClaimMilestoneResponse>> {
    let total_points = state
        .services
        .gamification
        .claim_milestone_reward(req.user_id, req.milestone_id)
        .await?;
    Ok(Json(ClaimMilestoneResponse { total_points }))
}
