//! Achievement System
//!
//! Every catalog entry carries a stable `code` and a typed [`AchievementRule`].
//! One comparator evaluates all rules against the activity that just
//! happened plus the user's current stats, so renaming a badge never
//! silently disables it.
//!
//! Unlocking is idempotent per (user, achievement): [`evaluate_unlocks`]
//! skips ids the user already earned, and the store enforces the same
//! with an insert-if-absent.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{
    Achievement, AchievementCategory, AchievementTier, ActivityData, ActivityType,
    GamificationStats,
};

/// Condition attached to an achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementRule {
    /// The very first lesson completion
    FirstLesson,
    /// Current streak reaches a number of days
    StreakAtLeast { days: u32 },
    /// Lessons completed today (including the current one)
    LessonsTodayAtLeast { count: u32 },
    /// Any perfect-score activity
    PerfectScore,
    /// Cumulative profile points
    PointsAtLeast { points: u64 },
    /// Single activity accuracy
    AccuracyAtLeast { percent: f64 },
    /// Conversation practice exchanges in one session
    ConversationExchangesAtLeast { count: u32 },
    /// Any completion of the given activity type
    ActivityCompleted { activity_type: ActivityType },
}

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub activity: &'a ActivityData,
    pub stats: &'a GamificationStats,
    pub total_points: u64,
}

impl AchievementRule {
    pub fn is_satisfied(&self, ctx: &RuleContext<'_>) -> bool {
        let activity = ctx.activity;
        match self {
            Self::FirstLesson => activity.lesson_completed && activity.is_first_lesson,
            Self::StreakAtLeast { days } => ctx.stats.current_streak >= *days,
            Self::LessonsTodayAtLeast { count } => activity.lessons_completed_today >= *count,
            Self::PerfectScore => activity.is_perfect_score,
            Self::PointsAtLeast { points } => ctx.total_points >= *points,
            Self::AccuracyAtLeast { percent } => {
                activity.accuracy.is_some_and(|acc| acc >= *percent)
            }
            Self::ConversationExchangesAtLeast { count } => {
                activity.exchange_count.is_some_and(|n| n >= *count)
            }
            Self::ActivityCompleted { activity_type } => {
                activity.activity_type == Some(*activity_type)
            }
        }
    }
}

/// Catalog entries not yet earned whose rule holds for this context
pub fn evaluate_unlocks<'a>(
    catalog: &'a [Achievement],
    earned: &HashSet<i64>,
    ctx: &RuleContext<'_>,
) -> Vec<&'a Achievement> {
    catalog
        .iter()
        .filter(|a| !earned.contains(&a.id))
        .filter(|a| a.rule.is_satisfied(ctx))
        .collect()
}

/// Share of the catalog earned, 0-100
pub fn completion_percent(catalog_len: usize, earned: usize) -> f32 {
    if catalog_len == 0 {
        return 0.0;
    }
    earned.min(catalog_len) as f32 * 100.0 / catalog_len as f32
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: i64,
    code: &str,
    name: &str,
    description: &str,
    category: AchievementCategory,
    tier: AchievementTier,
    points_required: u64,
    badge_icon: &str,
    rule: AchievementRule,
) -> Achievement {
    let badge_color = match tier {
        AchievementTier::Bronze => "#CD7F32",
        AchievementTier::Silver => "#C0C0C0",
        AchievementTier::Gold => "#FFD700",
        AchievementTier::Platinum => "#E5E4E2",
    };
    Achievement {
        id,
        code: code.into(),
        name: name.into(),
        description: description.into(),
        category,
        tier,
        points_required,
        badge_icon: badge_icon.into(),
        badge_color: badge_color.into(),
        rule,
    }
}

/// Built-in catalog seeded into a fresh store
pub fn default_catalog() -> Vec<Achievement> {
    use AchievementCategory as C;
    use AchievementTier as T;

    vec![
        // === Progress ===
        entry(
            1,
            "first_steps",
            "First Steps",
            "Complete your first French lesson.",
            C::Progress,
            T::Bronze,
            0,
            "footprints",
            AchievementRule::FirstLesson,
        ),
        entry(
            2,
            "speed_learner",
            "Speed Learner",
            "Complete 10 lessons in a single day.",
            C::Progress,
            T::Gold,
            0,
            "lightning",
            AchievementRule::LessonsTodayAtLeast { count: 10 },
        ),
        entry(
            3,
            "culture_curious",
            "Curieux de culture",
            "Finish a cultural lesson.",
            C::Progress,
            T::Bronze,
            0,
            "eiffel",
            AchievementRule::ActivityCompleted {
                activity_type: ActivityType::CulturalLesson,
            },
        ),
        // === Streak ===
        entry(
            10,
            "consistent_learner",
            "Consistent Learner",
            "Keep a 7-day learning streak.",
            C::Streak,
            T::Silver,
            0,
            "flame",
            AchievementRule::StreakAtLeast { days: 7 },
        ),
        entry(
            11,
            "dedicated_student",
            "Dedicated Student",
            "Keep a 30-day learning streak.",
            C::Streak,
            T::Gold,
            0,
            "trophy",
            AchievementRule::StreakAtLeast { days: 30 },
        ),
        // === Excellence ===
        entry(
            20,
            "perfectionist",
            "Perfectionist",
            "Score 100% on a lesson.",
            C::Excellence,
            T::Silver,
            0,
            "star",
            AchievementRule::PerfectScore,
        ),
        entry(
            21,
            "golden_ear",
            "Golden Ear",
            "Reach 95% accuracy in one activity.",
            C::Excellence,
            T::Gold,
            0,
            "ear",
            AchievementRule::AccuracyAtLeast { percent: 95.0 },
        ),
        // === Points ===
        entry(
            30,
            "point_collector",
            "Point Collector",
            "Earn 1,000 points.",
            C::Points,
            T::Silver,
            1_000,
            "coins",
            AchievementRule::PointsAtLeast { points: 1_000 },
        ),
        entry(
            31,
            "point_hoarder",
            "Point Hoarder",
            "Earn 10,000 points.",
            C::Points,
            T::Platinum,
            10_000,
            "treasure",
            AchievementRule::PointsAtLeast { points: 10_000 },
        ),
        // === Conversation ===
        entry(
            40,
            "chatterbox",
            "Bavard",
            "Hold a conversation of 10 exchanges with your AI partner.",
            C::Conversation,
            T::Silver,
            0,
            "speech",
            AchievementRule::ConversationExchangesAtLeast { count: 10 },
        ),
    ]
}
