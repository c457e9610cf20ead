//! Data Model
//!
//! Row-shaped types shared by the rule engines and the storage layer.
//! Each type mirrors one table of the remote store:
//! - profiles, user_progress (with embedded section progress), lessons
//! - gamification_stats, streak_shields
//! - achievements, user_achievements
//! - milestone_rewards, user_milestone_completions
//! - daily_challenges, user_challenge_completions
//! - daily_stats, points_history
//! - vocabulary_progress, grammar_progress

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::achievements::AchievementRule;
use crate::error::ParseError;

pub type UserId = i64;
pub type LessonId = i64;

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of activity that awards points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    LessonCompletion,
    VocabularyQuiz,
    GrammarExercise,
    PronunciationPractice,
    ConversationPractice,
    DailyChallenge,
    CulturalLesson,
    QuestionCompletion,
}

impl ActivityType {
    pub const ALL: [ActivityType; 8] = [
        ActivityType::LessonCompletion,
        ActivityType::VocabularyQuiz,
        ActivityType::GrammarExercise,
        ActivityType::PronunciationPractice,
        ActivityType::ConversationPractice,
        ActivityType::DailyChallenge,
        ActivityType::CulturalLesson,
        ActivityType::QuestionCompletion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessonCompletion => "lesson_completion",
            Self::VocabularyQuiz => "vocabulary_quiz",
            Self::GrammarExercise => "grammar_exercise",
            Self::PronunciationPractice => "pronunciation_practice",
            Self::ConversationPractice => "conversation_practice",
            Self::DailyChallenge => "daily_challenge",
            Self::CulturalLesson => "cultural_lesson",
            Self::QuestionCompletion => "question_completion",
        }
    }
}

impl FromStr for ActivityType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::new("activity type", s))
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a (user, lesson) progress row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    NotStarted,
    InProgress,
    Completed,
    Mastered,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Mastered => "mastered",
        }
    }

    /// Completed and mastered both count as a finished lesson
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Mastered)
    }
}

impl FromStr for LessonStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "mastered" => Ok(Self::Mastered),
            _ => Err(ParseError::new("lesson status", s)),
        }
    }
}

/// Lesson difficulty band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(ParseError::new("difficulty", s)),
        }
    }
}

/// Lesson content type, used to group performance metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Vocabulary,
    Grammar,
    Pronunciation,
    Conversation,
    Cultural,
    Reading,
    Listening,
}

impl LessonType {
    pub const ALL: [LessonType; 7] = [
        LessonType::Vocabulary,
        LessonType::Grammar,
        LessonType::Pronunciation,
        LessonType::Conversation,
        LessonType::Cultural,
        LessonType::Reading,
        LessonType::Listening,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vocabulary => "vocabulary",
            Self::Grammar => "grammar",
            Self::Pronunciation => "pronunciation",
            Self::Conversation => "conversation",
            Self::Cultural => "cultural",
            Self::Reading => "reading",
            Self::Listening => "listening",
        }
    }
}

impl FromStr for LessonType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseError::new("lesson type", s))
    }
}

// ============================================================================
// Users & Lessons
// ============================================================================

/// User identity plus cumulative points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub points: u64,
    /// One of the seven level names, see [`crate::milestones::Level`]
    pub level: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Static lesson metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub lesson_type: LessonType,
    pub difficulty: Difficulty,
}

/// Per-section completion record, embedded in [`UserProgress`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section_id: String,
    pub completed: bool,
    pub score: u8,
    pub time_spent: u32,
    pub attempts: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One row per (user, lesson)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub status: LessonStatus,
    /// 0-100
    pub score: u8,
    /// Seconds
    pub time_spent: u32,
    pub attempts: u32,
    pub section_progress: Vec<SectionProgress>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// Fresh row created on first lesson access
    pub fn started(user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            status: LessonStatus::InProgress,
            score: 0,
            time_spent: 0,
            attempts: 1,
            section_progress: Vec::new(),
            started_at: Some(now),
            completed_at: None,
            updated_at: now,
        }
    }
}

// ============================================================================
// Gamification
// ============================================================================

/// Per-user streak, shield and running point counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamificationStats {
    pub user_id: UserId,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_shields: u32,
    pub used_shields: u32,
    pub weekly_points: u64,
    pub monthly_points: u64,
    /// Monday of the week `weekly_points` belongs to
    pub week_start: Option<NaiveDate>,
    /// First day of the month `monthly_points` belongs to
    pub month_start: Option<NaiveDate>,
    pub last_activity_date: Option<DateTime<Utc>>,
}

impl GamificationStats {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            total_shields: 0,
            used_shields: 0,
            weekly_points: 0,
            monthly_points: 0,
            week_start: None,
            month_start: None,
            last_activity_date: None,
        }
    }

    pub fn available_shields(&self) -> u32 {
        self.total_shields.saturating_sub(self.used_shields)
    }
}

/// One row per shield grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakShield {
    pub id: i64,
    pub user_id: UserId,
    pub earned_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_used: bool,
    pub shield_type: String,
}

/// Achievement grouping shown in the badge screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Progress,
    Streak,
    Excellence,
    Points,
    Conversation,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Streak => "streak",
            Self::Excellence => "excellence",
            Self::Points => "points",
            Self::Conversation => "conversation",
        }
    }
}

impl FromStr for AchievementCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "progress" => Ok(Self::Progress),
            "streak" => Ok(Self::Streak),
            "excellence" => Ok(Self::Excellence),
            "points" => Ok(Self::Points),
            "conversation" => Ok(Self::Conversation),
            _ => Err(ParseError::new("achievement category", s)),
        }
    }
}

/// Badge tier (determines badge art)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl AchievementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

impl FromStr for AchievementTier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            _ => Err(ParseError::new("achievement tier", s)),
        }
    }
}

/// Static catalog row, immutable at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    /// Stable key; rules never match on `name`
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub tier: AchievementTier,
    pub points_required: u64,
    pub badge_icon: String,
    pub badge_color: String,
    pub rule: AchievementRule,
}

/// Junction row, unique per (user, achievement)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: UserId,
    pub achievement_id: i64,
    pub earned_at: DateTime<Utc>,
    /// 0-100
    pub progress: u8,
    pub is_claimed: bool,
}

/// Metric a milestone is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Points,
    Streak,
    Level,
    Achievements,
}

impl MilestoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Streak => "streak",
            Self::Level => "level",
            Self::Achievements => "achievements",
        }
    }
}

impl FromStr for MilestoneKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "points" => Ok(Self::Points),
            "streak" => Ok(Self::Streak),
            "level" => Ok(Self::Level),
            "achievements" => Ok(Self::Achievements),
            _ => Err(ParseError::new("milestone type", s)),
        }
    }
}

/// Static milestone catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneReward {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub kind: MilestoneKind,
    pub threshold_value: u64,
    pub reward_points: u64,
}

/// Junction row, unique per (user, milestone)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMilestoneCompletion {
    pub user_id: UserId,
    pub milestone_id: i64,
    pub completed_at: DateTime<Utc>,
    pub reward_claimed: bool,
}

/// One challenge per calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub id: i64,
    pub challenge_date: NaiveDate,
    pub title: String,
    pub description: String,
    pub requirements: serde_json::Value,
    pub reward_points: u32,
}

/// Junction row, unique per (user, challenge)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserChallengeCompletion {
    pub user_id: UserId,
    pub challenge_id: i64,
    pub points_earned: u64,
    pub performance_data: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// One row per (user, date), upserted additively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub lessons_completed: u32,
    pub study_time_minutes: u32,
    pub perfect_scores: u32,
    pub points_earned: u64,
}

impl DailyStats {
    pub fn has_activity(&self) -> bool {
        self.lessons_completed > 0 || self.points_earned > 0
    }
}

/// Increment applied to a [`DailyStats`] row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatsDelta {
    pub lessons_completed: u32,
    pub study_time_minutes: u32,
    pub perfect_scores: u32,
    pub points_earned: u64,
}

/// Append-only audit ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsHistoryEntry {
    pub user_id: UserId,
    pub points_earned: u64,
    pub points_type: ActivityType,
    pub source_id: Option<String>,
    pub earned_at: DateTime<Utc>,
}

/// Vocabulary word or grammar rule practice state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub user_id: UserId,
    pub item_id: i64,
    /// 0-5
    pub mastery_level: u8,
    /// 0-5, higher is harder for this user
    pub difficulty_rating: u8,
    pub times_practiced: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

pub type VocabularyProgress = ItemProgress;
pub type GrammarProgress = ItemProgress;

// ============================================================================
// Activity payloads
// ============================================================================

/// Contextual performance data for a single activity.
///
/// Shared by the points calculation and the achievement rules, so every
/// field is optional with a neutral default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityData {
    /// 0-100
    pub accuracy: Option<f64>,
    pub is_perfect_score: bool,
    /// Vocabulary quiz: five correct answers in a row
    pub five_in_a_row: bool,
    /// Grammar exercise solved on the first attempt
    pub first_attempt: bool,
    /// Daily challenge completed while a streak is active
    pub has_streak: bool,
    /// Conversation practice exchange count
    pub exchange_count: Option<u32>,
    pub activity_type: Option<ActivityType>,
    pub lesson_completed: bool,
    pub is_first_lesson: bool,
    pub lessons_completed_today: u32,
    pub lesson_id: Option<LessonId>,
    pub difficulty: Option<Difficulty>,
}

/// Result returned to the lesson/quiz caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub points_earned: u64,
    pub achievements_unlocked: Vec<Achievement>,
    pub milestones_reached: Vec<MilestoneReward>,
    pub streak_updated: bool,
    pub feedback: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_roundtrip_str() {
        for a in ActivityType::ALL {
            assert_eq!(a.as_str().parse::<ActivityType>().unwrap(), a);
        }
        assert!("karaoke".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_status_finished() {
        assert!(LessonStatus::Completed.is_finished());
        assert!(LessonStatus::Mastered.is_finished());
        assert!(!LessonStatus::InProgress.is_finished());
        assert!(!LessonStatus::NotStarted.is_finished());
    }

    #[test]
    fn test_available_shields_never_negative() {
        let mut stats = GamificationStats::new(1);
        stats.total_shields = 1;
        stats.used_shields = 3;
        assert_eq!(stats.available_shields(), 0);
    }

    #[test]
    fn test_activity_result_uses_camel_case() {
        let result = ActivityResult {
            points_earned: 10,
            streak_updated: true,
            feedback: "ok".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pointsEarned"], 10);
        assert_eq!(json["streakUpdated"], true);
        assert!(json["achievementsUnlocked"].is_array());
        assert!(json["milestonesReached"].is_array());
    }

    #[test]
    fn test_activity_data_defaults_from_partial_json() {
        let data: ActivityData = serde_json::from_str(r#"{"accuracy": 82.5}"#).unwrap();
        assert_eq!(data.accuracy, Some(82.5));
        assert!(!data.is_perfect_score);
        assert_eq!(data.lessons_completed_today, 0);
    }
}
