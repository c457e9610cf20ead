//! Centralized rule constants for the progress core.
//!
//! Eliminates magic numbers duplicated between the points engine, the
//! streak tracker, the analytics aggregator and the server services.

// =====================================================
// Points
// =====================================================

/// Fixed base award for completing a lesson
pub const LESSON_COMPLETION_BASE_POINTS: u32 = 50;

/// Base award for one correctly answered question
pub const QUESTION_COMPLETION_BASE_POINTS: u32 = 10;

/// Accuracy (percent) above which the accuracy bonus applies
pub const ACCURACY_BONUS_THRESHOLD: f64 = 70.0;

/// Bonus points per accuracy percent above the threshold
pub const ACCURACY_BONUS_RATE: f64 = 0.5;

/// Perfect-score bonus as a fraction of the base points
pub const PERFECT_SCORE_BONUS_RATE: f64 = 0.5;

/// Streak multiplier table, highest threshold first: (min streak days, multiplier)
pub const STREAK_MULTIPLIERS: [(u32, f64); 4] = [(30, 2.0), (14, 1.75), (7, 1.5), (3, 1.25)];

/// Activity-specific bonuses added to the base before the multiplier
pub const LESSON_PERFECT_BONUS: u32 = 25;
pub const VOCABULARY_FIVE_IN_A_ROW_BONUS: u32 = 5;
pub const GRAMMAR_FIRST_ATTEMPT_BONUS: u32 = 10;
pub const PRONUNCIATION_HIGH_ACCURACY_BONUS: u32 = 15;
pub const PRONUNCIATION_HIGH_ACCURACY: f64 = 90.0;
pub const DAILY_CHALLENGE_STREAK_BONUS: u32 = 50;
pub const CONVERSATION_LONG_EXCHANGE_BONUS: u32 = 25;
pub const CONVERSATION_LONG_EXCHANGE_COUNT: u32 = 10;

/// Score treated as a perfect lesson
pub const PERFECT_SCORE: u8 = 100;

// =====================================================
// Streaks
// =====================================================

/// A shield is granted every time the streak reaches a multiple of this
pub const SHIELD_INTERVAL_DAYS: u32 = 7;

/// Shield type recorded for streak-earned shields
pub const STREAK_SHIELD_TYPE: &str = "streak_reward";

// =====================================================
// Analytics
// =====================================================

/// Completions per trend window (recent vs preceding)
pub const TREND_WINDOW: usize = 5;

/// Minimum entries in each window before a trend is reported
pub const TREND_MIN_ENTRIES: usize = 3;

/// Mean score difference that counts as improving/declining
pub const TREND_DELTA: f64 = 5.0;

/// Vocabulary/grammar items at or above this level count as mastered
pub const MASTERED_LEVEL: u8 = 4;

/// Items rated at or above this difficulty count as difficult
pub const DIFFICULT_RATING: u8 = 4;

/// Days in the "this week" window
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Days in the "this month" window
pub const MONTH_WINDOW_DAYS: i64 = 30;

/// Daily stats rows considered by the consistency score
pub const CONSISTENCY_WINDOW_ROWS: usize = 30;

/// Days averaged by the learning velocity
pub const VELOCITY_WINDOW_DAYS: i64 = 7;

// =====================================================
// Store read limits
// =====================================================

/// Daily stats rows fetched for analytics
pub const DAILY_STATS_LOOKBACK_DAYS: i64 = 30;

/// Points history rows fetched for analytics
pub const POINTS_HISTORY_LIMIT: usize = 100;
