//! Points Engine (pure calculation)
//!
//! `total = round((base + activity_bonus) * streak_multiplier + accuracy_bonus + perfect_bonus)`
//!
//! - Streak multiplier is a step function of the current streak
//!   (>=30 x2.00, >=14 x1.75, >=7 x1.50, >=3 x1.25, else x1.00)
//! - Accuracy bonus: half a point per percent above 70
//! - Perfect-score bonus: half the *unadjusted* base points
//! - Activity bonus: per activity type, added to the base before the multiplier
//!
//! Persisting the award (profile points, weekly/monthly counters) is the
//! caller's job; this module never touches storage. [`accrue_period_points`]
//! keeps the running weekly/monthly counters honest across period changes.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::model::{ActivityData, ActivityType, GamificationStats};

/// Itemized result of a points calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsCalculation {
    pub activity_type: ActivityType,
    pub base_points: u32,
    pub activity_bonus: u32,
    pub adjusted_base: u32,
    pub streak_multiplier: f64,
    pub accuracy_bonus: f64,
    pub perfect_score_bonus: f64,
    pub total: u64,
}

/// Multiplier for a given current streak (inclusive lower bounds, highest first)
pub fn streak_multiplier(current_streak: u32) -> f64 {
    STREAK_MULTIPLIERS
        .iter()
        .find(|(min_days, _)| current_streak >= *min_days)
        .map(|(_, mult)| *mult)
        .unwrap_or(1.0)
}

pub fn accuracy_bonus(accuracy: Option<f64>) -> f64 {
    match accuracy {
        Some(acc) if acc > ACCURACY_BONUS_THRESHOLD => {
            (acc.min(100.0) - ACCURACY_BONUS_THRESHOLD) * ACCURACY_BONUS_RATE
        }
        _ => 0.0,
    }
}

pub fn perfect_score_bonus(base_points: u32, is_perfect_score: bool) -> f64 {
    if is_perfect_score {
        base_points as f64 * PERFECT_SCORE_BONUS_RATE
    } else {
        0.0
    }
}

/// Activity-specific additive bonus
pub fn activity_bonus(activity_type: ActivityType, data: &ActivityData) -> u32 {
    match activity_type {
        ActivityType::LessonCompletion if data.is_perfect_score => LESSON_PERFECT_BONUS,
        ActivityType::VocabularyQuiz if data.five_in_a_row => VOCABULARY_FIVE_IN_A_ROW_BONUS,
        ActivityType::GrammarExercise if data.first_attempt => GRAMMAR_FIRST_ATTEMPT_BONUS,
        ActivityType::PronunciationPractice
            if data
                .accuracy
                .is_some_and(|acc| acc > PRONUNCIATION_HIGH_ACCURACY) =>
        {
            PRONUNCIATION_HIGH_ACCURACY_BONUS
        }
        ActivityType::DailyChallenge if data.has_streak => DAILY_CHALLENGE_STREAK_BONUS,
        ActivityType::ConversationPractice
            if data
                .exchange_count
                .is_some_and(|n| n >= CONVERSATION_LONG_EXCHANGE_COUNT) =>
        {
            CONVERSATION_LONG_EXCHANGE_BONUS
        }
        _ => 0,
    }
}

/// Compute the full award for one activity
pub fn calculate(
    activity_type: ActivityType,
    base_points: u32,
    data: &ActivityData,
    current_streak: u32,
) -> PointsCalculation {
    let activity_bonus = activity_bonus(activity_type, data);
    let adjusted_base = base_points + activity_bonus;
    let streak_multiplier = streak_multiplier(current_streak);
    let accuracy_bonus = accuracy_bonus(data.accuracy);
    let perfect_score_bonus = perfect_score_bonus(base_points, data.is_perfect_score);

    let raw = adjusted_base as f64 * streak_multiplier + accuracy_bonus + perfect_score_bonus;
    let total = raw.round().max(0.0) as u64;

    PointsCalculation {
        activity_type,
        base_points,
        activity_bonus,
        adjusted_base,
        streak_multiplier,
        accuracy_bonus,
        perfect_score_bonus,
        total,
    }
}

/// Monday of the ISO week containing `date`
pub fn week_anchor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing `date`
pub fn month_anchor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

/// Add an award to the weekly/monthly counters, resetting a counter first
/// when `awarded_on` falls in a later period than its anchor.
///
/// Awards dated before the stored anchor still count toward the current
/// period; anchors never move backwards.
pub fn accrue_period_points(stats: &mut GamificationStats, awarded_on: NaiveDate, points: u64) {
    let week = week_anchor(awarded_on);
    match stats.week_start {
        Some(anchor) if anchor >= week => {}
        _ => {
            stats.week_start = Some(week);
            stats.weekly_points = 0;
        }
    }
    stats.weekly_points += points;

    let month = month_anchor(awarded_on);
    match stats.month_start {
        Some(anchor) if anchor >= month => {}
        _ => {
            stats.month_start = Some(month);
            stats.monthly_points = 0;
        }
    }
    stats.monthly_points += points;
}

/// Short encouragement shown after an activity
pub fn feedback_message(score: u8) -> &'static str {
    match score {
        100.. => "Parfait ! Perfect score!",
        90..=99 => "Excellent work!",
        70..=89 => "Bien joué! Good job!",
        50..=69 => "Not bad, keep practicing!",
        _ => "Keep going, every lesson counts!",
    }
}
