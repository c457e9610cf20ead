//! Streaks, achievements, milestones and daily challenges against the
//! in-memory store.

mod common;

use chrono::Duration;
use serde_json::json;

use common::*;
use progress_core::streak::StreakTransition;
use progress_core::{ActivityData, ActivityType};
use progress_server::storage::memory::FailPoint;
use progress_server::storage::seed_data;
use progress_server::ServiceError;

// ============================================================================
// Streak Tracker
// ============================================================================

#[tokio::test]
async fn test_consecutive_days_build_streak_and_grant_shield() {
    let env = setup().await;
    let gamification = &env.services.gamification;

    for day in 0..7 {
        let decision = gamification
            .update_streak(USER, start_time() + Duration::days(day))
            .await
            .unwrap();
        assert_eq!(decision.new_streak, day as u32 + 1);
    }

    let stats = stats(&env).await;
    assert_eq!(stats.current_streak, 7);
    assert_eq!(stats.longest_streak, 7);
    assert_eq!(stats.total_shields, 1);
    assert_eq!(stats.available_shields(), 1);
}

#[tokio::test]
async fn test_gap_consumes_oldest_shield() {
    let env = setup().await;
    set_streak(&env, 7, at(2, 27, 10), 1).await;
    let shield_id = env
        .storage
        .shields
        .grant(USER, at(2, 27, 10), "streak_reward")
        .await
        .unwrap();

    let decision = env
        .services
        .gamification
        .update_streak(USER, start_time())
        .await
        .unwrap();

    assert_eq!(decision.transition, StreakTransition::ShieldProtected);
    let stats = stats(&env).await;
    assert_eq!(stats.current_streak, 7);
    assert_eq!(stats.used_shields, 1);
    assert_eq!(stats.last_activity_date, Some(start_time()));

    let shields = env.storage.shields.get_all_for_user(USER).await.unwrap();
    let used = shields.iter().find(|s| s.id == shield_id).unwrap();
    assert!(used.is_used);
    assert_eq!(used.used_at, Some(start_time()));
}

#[tokio::test]
async fn test_gap_without_shield_resets() {
    let env = setup().await;
    set_streak(&env, 12, at(2, 26, 10), 0).await;

    let decision = env
        .services
        .gamification
        .update_streak(USER, start_time())
        .await
        .unwrap();

    assert_eq!(decision.transition, StreakTransition::Reset);
    let stats = stats(&env).await;
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 12);
}

#[tokio::test]
async fn test_late_evening_then_early_morning_continues() {
    let env = setup().await;
    let gamification = &env.services.gamification;

    gamification.update_streak(USER, at(3, 2, 23)).await.unwrap();
    let decision = gamification.update_streak(USER, at(3, 3, 1)).await.unwrap();

    assert_eq!(decision.transition, StreakTransition::Continued);
    assert_eq!(stats(&env).await.current_streak, 2);
}

#[tokio::test]
async fn test_same_day_repeat_changes_nothing() {
    let env = setup().await;
    let gamification = &env.services.gamification;

    gamification.update_streak(USER, at(3, 2, 8)).await.unwrap();
    let before = stats(&env).await;
    let decision = gamification.update_streak(USER, at(3, 2, 20)).await.unwrap();

    assert!(!decision.streak_updated());
    assert_eq!(stats(&env).await, before);
}

// ============================================================================
// Points Engine
// ============================================================================

#[tokio::test]
async fn test_points_for_missing_profile_is_not_found() {
    let env = setup().await;
    let err = env
        .services
        .gamification
        .calculate_points(99, ActivityType::VocabularyQuiz, 20, &ActivityData::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_weekly_points_roll_over_monthly_accumulate() {
    let env = setup().await;
    let gamification = &env.services.gamification;
    let data = ActivityData::default();

    gamification
        .calculate_points(USER, ActivityType::VocabularyQuiz, 40, &data)
        .await
        .unwrap();
    env.clock.advance(Duration::days(7));
    gamification
        .calculate_points(USER, ActivityType::VocabularyQuiz, 15, &data)
        .await
        .unwrap();

    let stats = stats(&env).await;
    assert_eq!(stats.weekly_points, 15);
    assert_eq!(stats.monthly_points, 55);
    assert_eq!(profile_points(&env).await, 55);
}

// ============================================================================
// Achievement Engine
// ============================================================================

#[tokio::test]
async fn test_achievements_unlock_once() {
    let env = setup().await;
    let gamification = &env.services.gamification;
    let data = ActivityData {
        is_perfect_score: true,
        exchange_count: Some(12),
        activity_type: Some(ActivityType::ConversationPractice),
        ..Default::default()
    };

    let first = gamification.check_and_unlock(USER, &data).await.unwrap();
    let mut codes: Vec<&str> = first.iter().map(|a| a.code.as_str()).collect();
    codes.sort();
    assert_eq!(codes, vec!["chatterbox", "perfectionist"]);

    let second = gamification.check_and_unlock(USER, &data).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(env.storage.achievements.earned(USER).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_streak_achievements_follow_current_streak() {
    let env = setup().await;
    set_streak(&env, 30, at(3, 1, 9), 4).await;

    let unlocked = env
        .services
        .gamification
        .check_and_unlock(USER, &ActivityData::default())
        .await
        .unwrap();
    let mut codes: Vec<&str> = unlocked.iter().map(|a| a.code.as_str()).collect();
    codes.sort();
    assert_eq!(codes, vec!["consistent_learner", "dedicated_student"]);
}

#[tokio::test]
async fn test_claim_achievement_once() {
    let env = setup().await;
    let gamification = &env.services.gamification;
    let data = ActivityData {
        is_perfect_score: true,
        ..Default::default()
    };
    gamification.check_and_unlock(USER, &data).await.unwrap();

    gamification.claim_achievement(USER, 20).await.unwrap();
    let again = gamification.claim_achievement(USER, 20).await.unwrap_err();
    assert!(matches!(again, ServiceError::AlreadyClaimed(_)));

    let never = gamification.claim_achievement(USER, 11).await.unwrap_err();
    assert!(matches!(never, ServiceError::NotFound(_)));

    let overview = gamification.list_user_achievements(USER).await.unwrap();
    assert_eq!(overview.earned.len(), 1);
    assert!(overview.earned[0].is_claimed);
    assert!(overview.completion_percent > 0.0);
}

// ============================================================================
// Milestone Engine
// ============================================================================

#[tokio::test]
async fn test_milestones_reached_once_and_reward_claimed_once() {
    let env = setup().await;
    let gamification = &env.services.gamification;
    env.storage.profiles.add_points(USER, 1_000).await.unwrap();

    let reached: Vec<i64> = gamification
        .check_milestones(USER)
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(reached, vec![1, 2]);
    assert!(gamification.check_milestones(USER).await.unwrap().is_empty());

    let total = gamification.claim_milestone_reward(USER, 2).await.unwrap();
    assert_eq!(total, 1_050);
    let again = gamification.claim_milestone_reward(USER, 2).await.unwrap_err();
    assert!(matches!(again, ServiceError::AlreadyClaimed(_)));
    assert_eq!(profile_points(&env).await, 1_050);

    let unreached = gamification.claim_milestone_reward(USER, 3).await.unwrap_err();
    assert!(matches!(unreached, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_level_milestone_uses_rank() {
    let env = setup().await;
    env.storage
        .profiles
        .create(&progress_core::Profile {
            id: 2,
            username: "bastien".into(),
            points: 0,
            level: "upper_intermediate".into(),
            created_at: None,
        })
        .await
        .unwrap();

    let reached: Vec<i64> = env
        .services
        .gamification
        .check_milestones(2)
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(reached, vec![20]);
}

// ============================================================================
// Daily challenge
// ============================================================================

#[tokio::test]
async fn test_challenge_with_streak_awards_150_once() {
    let env = setup().await;
    set_streak(&env, 1, at(3, 1, 9), 0).await;
    let challenge = seed_data::seed_challenge(&env.storage, start_time().date_naive())
        .await
        .unwrap();
    let gamification = &env.services.gamification;

    let today = gamification.today_challenge().await.unwrap().unwrap();
    assert_eq!(today.id, challenge.id);

    let result = gamification
        .complete_daily_challenge(USER, challenge.id, json!({ "lessons": 2 }))
        .await
        .unwrap();
    assert_eq!(result.points_earned, 150);
    assert!(!result.streak_updated);
    assert_eq!(profile_points(&env).await, 150);

    let completion = env
        .storage
        .challenges
        .completion(USER, challenge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completion.points_earned, 150);

    let again = gamification
        .complete_daily_challenge(USER, challenge.id, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(again, ServiceError::AlreadyCompleted(_)));
    assert_eq!(profile_points(&env).await, 150);
}

#[tokio::test]
async fn test_challenge_without_streak_pays_reward_only() {
    let env = setup().await;
    let challenge = seed_data::seed_challenge(&env.storage, start_time().date_naive())
        .await
        .unwrap();

    let result = env
        .services
        .gamification
        .complete_daily_challenge(USER, challenge.id, json!({}))
        .await
        .unwrap();
    assert_eq!(result.points_earned, 100);

    let missing = env
        .services
        .gamification
        .complete_daily_challenge(USER, 1, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_challenge_stays_open_when_award_fails() {
    let env = setup().await;
    let challenge = seed_data::seed_challenge(&env.storage, start_time().date_naive())
        .await
        .unwrap();
    let gamification = &env.services.gamification;

    env.store.fail(FailPoint::Profiles);
    let err = gamification
        .complete_daily_challenge(USER, challenge.id, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));

    env.store.heal_all();
    assert!(env
        .storage
        .challenges
        .completion(USER, challenge.id)
        .await
        .unwrap()
        .is_none());

    let retry = gamification
        .complete_daily_challenge(USER, challenge.id, json!({}))
        .await
        .unwrap();
    assert_eq!(retry.points_earned, 100);
    assert_eq!(profile_points(&env).await, 100);
    let completion = env
        .storage
        .challenges
        .completion(USER, challenge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completion.points_earned, 100);
}

#[tokio::test]
async fn test_challenge_ledger_failures_keep_the_award() {
    let env = setup().await;
    let challenge = seed_data::seed_challenge(&env.storage, start_time().date_naive())
        .await
        .unwrap();
    env.store.fail(FailPoint::PointsHistory);
    env.store.fail(FailPoint::DailyStats);

    let result = env
        .services
        .gamification
        .complete_daily_challenge(USER, challenge.id, json!({}))
        .await
        .unwrap();
    assert_eq!(result.points_earned, 100);

    env.store.heal_all();
    assert_eq!(profile_points(&env).await, 100);
    assert!(env
        .storage
        .challenges
        .completion(USER, challenge.id)
        .await
        .unwrap()
        .is_some());
    assert!(env.storage.points_history.recent(USER, 10).await.unwrap().is_empty());
}
