//! Lesson progress rows, exercises and analytics against the in-memory store.

mod common;

use chrono::Duration;

use common::*;
use progress_core::analytics::ImprovementTrend;
use progress_core::sections::SectionAttempt;
use progress_core::{ItemProgress, LessonStatus, LessonType};
use progress_server::services::progress::ExerciseAnswer;
use progress_server::storage::repository::ItemKind;
use progress_server::ServiceError;

fn attempt(section_id: &str, completed: bool, score: u8) -> SectionAttempt {
    SectionAttempt {
        section_id: section_id.into(),
        completed,
        score,
        time_spent: 60,
    }
}

// ============================================================================
// Progress rows
// ============================================================================

#[tokio::test]
async fn test_start_lesson_is_idempotent() {
    let env = setup().await;
    let progress = &env.services.progress;

    let first = progress.start_lesson(USER, 1).await.unwrap();
    assert_eq!(first.status, LessonStatus::InProgress);
    assert_eq!(first.attempts, 1);

    env.clock.advance(Duration::minutes(5));
    let second = progress.start_lesson(USER, 1).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_start_unknown_lesson_is_not_found() {
    let env = setup().await;
    let err = env.services.progress.start_lesson(USER, 999).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_sections_upsert_by_id() {
    let env = setup().await;
    let progress = &env.services.progress;

    progress
        .record_section_progress(USER, 1, &attempt("vocab", false, 40))
        .await
        .unwrap();
    progress
        .record_section_progress(USER, 1, &attempt("vocab", true, 90))
        .await
        .unwrap();
    let row = progress
        .record_section_progress(USER, 1, &attempt("dialogue", false, 0))
        .await
        .unwrap();

    assert_eq!(row.section_progress.len(), 2);
    let vocab = row
        .section_progress
        .iter()
        .find(|s| s.section_id == "vocab")
        .unwrap();
    assert_eq!(vocab.attempts, 2);
    assert_eq!(vocab.score, 90);
    assert!(vocab.completed);
    assert_eq!(row.time_spent, 180);

    let stored = env.storage.progress.get(USER, 1).await.unwrap().unwrap();
    assert_eq!(stored, row);
}

#[tokio::test]
async fn test_section_score_out_of_range_rejected() {
    let env = setup().await;
    let err = env
        .services
        .progress
        .record_section_progress(USER, 1, &attempt("vocab", true, 140))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn test_correct_exercise_awards_question_points() {
    let env = setup().await;
    let progress = &env.services.progress;

    let correct = progress
        .complete_exercise(
            USER,
            1,
            &ExerciseAnswer {
                section_id: "q1".into(),
                correct: true,
                score: 100,
                time_spent: 20,
                accuracy: Some(80.0),
            },
        )
        .await
        .unwrap();
    // 10 + (80 - 70) * 0.5
    assert_eq!(correct.points_earned, 15);

    let wrong = progress
        .complete_exercise(
            USER,
            1,
            &ExerciseAnswer {
                section_id: "q2".into(),
                correct: false,
                score: 0,
                time_spent: 20,
                accuracy: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(wrong.points_earned, 0);
    assert_eq!(wrong.progress.section_progress.len(), 2);
    assert_eq!(profile_points(&env).await, 15);
}

// ============================================================================
// Analytics
// ============================================================================

#[tokio::test]
async fn test_analytics_for_new_learner_is_all_zero() {
    let env = setup().await;
    let analytics = env.services.progress.compute_analytics(USER).await.unwrap();

    assert_eq!(analytics.total_lessons_completed, 0);
    assert_eq!(analytics.average_score, 0.0);
    assert_eq!(analytics.points_this_month, 0);
    assert_eq!(analytics.learning_velocity, 0.0);
    assert_eq!(analytics.consistency_score, 0.0);
    assert_eq!(analytics.vocabulary.mastery_percentage, 0.0);
    assert_eq!(analytics.performance_by_type.len(), LessonType::ALL.len());
    assert!(analytics
        .performance_by_type
        .values()
        .all(|m| m.improvement_trend == ImprovementTrend::Stable && m.attempted == 0));
}

#[tokio::test]
async fn test_analytics_reflect_completed_lessons() {
    let env = setup().await;
    let lessons = &env.services.lessons;

    // Two beginner lessons today, one intermediate tomorrow
    lessons.complete_lesson(USER, 1, 100, 600).await.unwrap();
    lessons.complete_lesson(USER, 2, 80, 300).await.unwrap();
    env.clock.advance(Duration::days(1));
    lessons.complete_lesson(USER, 10, 60, 900).await.unwrap();

    let analytics = env.services.progress.compute_analytics(USER).await.unwrap();
    assert_eq!(analytics.total_lessons_completed, 3);
    assert_eq!(analytics.total_time_minutes, 30);
    assert!((analytics.average_score - 80.0).abs() < 1e-9);
    assert_eq!(analytics.lessons_today, 1);
    assert_eq!(analytics.lessons_this_week, 3);
    assert!((analytics.difficulty_scores.beginner - 90.0).abs() < 1e-9);
    assert!((analytics.difficulty_scores.intermediate - 60.0).abs() < 1e-9);
    assert_eq!(analytics.difficulty_scores.advanced, 0.0);
    assert!((analytics.learning_velocity - 3.0 / 7.0).abs() < 1e-9);
    assert_eq!(analytics.consistency_score, 100.0);

    let grammar = &analytics.performance_by_type[&LessonType::Grammar];
    assert_eq!(grammar.completed, 2);
    assert_eq!(grammar.completion_rate, 100.0);

    let ledger_total: u64 = analytics.points_by_type.values().sum();
    assert_eq!(ledger_total, analytics.points_this_week);
}

#[tokio::test]
async fn test_analytics_mastery_breakdown() {
    let env = setup().await;
    let now = start_time();
    let item = |item_id: i64, mastery_level: u8, difficulty_rating: u8, days_ago: i64| ItemProgress {
        user_id: USER,
        item_id,
        mastery_level,
        difficulty_rating,
        times_practiced: 3,
        last_practiced: Some(now - Duration::days(days_ago)),
    };
    for row in [item(1, 5, 0, 0), item(2, 2, 4, 3), item(3, 0, 1, 20), item(4, 4, 0, 1)] {
        env.storage.items.upsert(ItemKind::Vocabulary, &row).await.unwrap();
    }

    let analytics = env.services.progress.compute_analytics(USER).await.unwrap();
    let vocab = analytics.vocabulary;
    assert_eq!(vocab.total_items, 4);
    assert_eq!(vocab.mastered, 2);
    assert_eq!(vocab.mastery_percentage, 50.0);
    assert_eq!(vocab.learning, 1);
    assert_eq!(vocab.difficult, 1);
    assert_eq!(vocab.practiced_today, 1);
    assert_eq!(vocab.practiced_this_week, 3);
    assert_eq!(analytics.grammar.total_items, 0);
}
