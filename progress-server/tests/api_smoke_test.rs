//! API Smoke Tests
//!
//! Drives the router with `tower::ServiceExt::oneshot` over the seeded
//! in-memory store; no network or database required.

mod common;

use axum::body::Body;
use http::Request;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use progress_server::api;

fn router(env: &TestEnv) -> axum::Router {
    api::build_router(api::ApiState {
        services: env.services.clone(),
        metrics: env.metrics.clone(),
    })
}

async fn post(router: axum::Router, uri: &str, body: Value) -> (u16, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status().as_u16();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Health & Metrics
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let env = setup().await;
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = router(&env).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(!json["version"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_prometheus_metrics_text() {
    let env = setup().await;
    let req = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();

    let resp = router(&env).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("progress_lessons_completed_total 0"));
    assert!(text.contains("# TYPE progress_requests_total counter"));
}

// ============================================================================
// LessonService
// ============================================================================

#[tokio::test]
async fn test_complete_lesson_returns_camel_case_result() {
    let env = setup().await;
    set_streak(&env, 6, at(3, 1, 18), 0).await;

    let (status, json) = post(
        router(&env),
        "/progress.LessonService/CompleteLesson",
        json!({ "user_id": USER, "lesson_id": 1, "score": 100, "time_spent": 600 }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(json["completed"], true);
    assert_eq!(json["result"]["pointsEarned"], 119);
    assert_eq!(json["result"]["streakUpdated"], true);
    assert!(json["result"]["achievementsUnlocked"].as_array().unwrap().len() >= 2);
    assert_eq!(json["failedSteps"], json!([]));
}

#[tokio::test]
async fn test_complete_lesson_bad_score_is_400() {
    let env = setup().await;
    let (status, json) = post(
        router(&env),
        "/progress.LessonService/CompleteLesson",
        json!({ "user_id": USER, "lesson_id": 1, "score": 150 }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("150"));
}

#[tokio::test]
async fn test_record_section_flattened_body() {
    let env = setup().await;
    let (status, json) = post(
        router(&env),
        "/progress.LessonService/RecordSection",
        json!({
            "user_id": USER,
            "lesson_id": 2,
            "section_id": "articles",
            "completed": true,
            "score": 85,
            "time_spent": 120
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["section_progress"][0]["section_id"], "articles");
}

// ============================================================================
// GamificationService & AnalyticsService
// ============================================================================

#[tokio::test]
async fn test_get_stats_creates_row() {
    let env = setup().await;
    let (status, json) = post(
        router(&env),
        "/progress.GamificationService/GetStats",
        json!({ "user_id": USER }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["stats"]["current_streak"], 0);
    assert_eq!(json["streak_multiplier"], 1.0);
    assert!(json["today_challenge"].is_null());
    assert!(env.storage.stats.get(USER).await.unwrap().is_some());
}

#[tokio::test]
async fn test_claim_unearned_achievement_is_404() {
    let env = setup().await;
    let (status, _) = post(
        router(&env),
        "/progress.GamificationService/ClaimAchievement",
        json!({ "user_id": USER, "achievement_id": 1 }),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_analytics_endpoint() {
    let env = setup().await;
    env.services
        .lessons
        .complete_lesson(USER, 1, 90, 600)
        .await
        .unwrap();

    let (status, json) = post(
        router(&env),
        "/progress.AnalyticsService/GetAnalytics",
        json!({ "user_id": USER }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["total_lessons_completed"], 1);
    assert_eq!(json["points_today"], 50);
    assert!(json["performance_by_type"]["vocabulary"].is_object());
}

#[tokio::test]
async fn test_requests_are_counted() {
    let env = setup().await;
    let app = router(&env);
    post(
        app.clone(),
        "/progress.GamificationService/ClaimAchievement",
        json!({ "user_id": USER, "achievement_id": 1 }),
    )
    .await;
    post(app, "/progress.GamificationService/GetStats", json!({ "user_id": USER })).await;

    use std::sync::atomic::Ordering;
    assert_eq!(env.metrics.total_requests.load(Ordering::Relaxed), 2);
    assert_eq!(env.metrics.total_errors.load(Ordering::Relaxed), 1);
}
