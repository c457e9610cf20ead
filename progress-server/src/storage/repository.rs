//! Repository traits - abstraction layer for data access
//!
//! Every engine reads and writes through these traits, so the PostgreSQL
//! backend and the in-memory store are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use progress_core::{
    Achievement, DailyChallenge, DailyStats, DailyStatsDelta, GamificationStats, ItemProgress,
    Lesson, LessonId, MilestoneReward, ParseError, PointsHistoryEntry, Profile, StreakShield,
    UserAchievement, UserChallengeCompletion, UserId, UserMilestoneCompletion, UserProgress,
};

/// Error type for every repository operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<ParseError> for StoreError {
    fn from(e: ParseError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Generic result type for repository operations
pub type RepoResult<T> = Result<T, StoreError>;

/// Which practice table an [`ItemProgress`] row lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Vocabulary,
    Grammar,
}

// ============================================================================
// Users & Lessons
// ============================================================================

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Profile>>;
    async fn create(&self, profile: &Profile) -> RepoResult<()>;
    /// Add to cumulative points, returning the new total
    async fn add_points(&self, user_id: UserId, points: u64) -> RepoResult<u64>;
}

#[async_trait]
pub trait LessonRepo: Send + Sync {
    async fn get(&self, lesson_id: LessonId) -> RepoResult<Option<Lesson>>;
    async fn get_all(&self) -> RepoResult<Vec<Lesson>>;
    async fn upsert(&self, lesson: &Lesson) -> RepoResult<()>;
}

#[async_trait]
pub trait ProgressRepo: Send + Sync {
    async fn get(&self, user_id: UserId, lesson_id: LessonId) -> RepoResult<Option<UserProgress>>;
    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<UserProgress>>;
    /// Point-in-time upsert keyed by (user, lesson)
    async fn upsert(&self, progress: &UserProgress) -> RepoResult<()>;
    /// Lessons in completed or mastered status
    async fn count_completed(&self, user_id: UserId) -> RepoResult<u64>;
}

// ============================================================================
// Gamification
// ============================================================================

#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<GamificationStats>>;
    /// Insert a fresh row unless one exists; returns the stored row
    async fn create_if_absent(&self, stats: &GamificationStats) -> RepoResult<GamificationStats>;
    /// Single-row write of every field
    async fn update(&self, stats: &GamificationStats) -> RepoResult<()>;
}

#[async_trait]
pub trait ShieldRepo: Send + Sync {
    async fn grant(
        &self,
        user_id: UserId,
        earned_at: DateTime<Utc>,
        shield_type: &str,
    ) -> RepoResult<i64>;
    async fn oldest_unused(&self, user_id: UserId) -> RepoResult<Option<StreakShield>>;
    async fn mark_used(&self, shield_id: i64, used_at: DateTime<Utc>) -> RepoResult<()>;
    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<StreakShield>>;
}

#[async_trait]
pub trait AchievementRepo: Send + Sync {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>>;
    async fn upsert_definition(&self, achievement: &Achievement) -> RepoResult<()>;
    async fn earned(&self, user_id: UserId) -> RepoResult<Vec<UserAchievement>>;
    /// Insert-if-absent; false when the user already had it
    async fn insert_if_absent(&self, earned: &UserAchievement) -> RepoResult<bool>;
    /// Flip `is_claimed`; false when already claimed, NotFound when never earned
    async fn mark_claimed(&self, user_id: UserId, achievement_id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait MilestoneRepo: Send + Sync {
    async fn catalog(&self) -> RepoResult<Vec<MilestoneReward>>;
    async fn upsert_definition(&self, milestone: &MilestoneReward) -> RepoResult<()>;
    async fn completed(&self, user_id: UserId) -> RepoResult<Vec<UserMilestoneCompletion>>;
    async fn insert_if_absent(&self, completion: &UserMilestoneCompletion) -> RepoResult<bool>;
    async fn mark_reward_claimed(&self, user_id: UserId, milestone_id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait ChallengeRepo: Send + Sync {
    async fn get(&self, challenge_id: i64) -> RepoResult<Option<DailyChallenge>>;
    async fn for_date(&self, date: NaiveDate) -> RepoResult<Option<DailyChallenge>>;
    async fn upsert(&self, challenge: &DailyChallenge) -> RepoResult<()>;
    async fn completion(
        &self,
        user_id: UserId,
        challenge_id: i64,
    ) -> RepoResult<Option<UserChallengeCompletion>>;
    async fn insert_completion_if_absent(
        &self,
        completion: &UserChallengeCompletion,
    ) -> RepoResult<bool>;
    /// Release a completion whose points award did not go through
    async fn remove_completion(&self, user_id: UserId, challenge_id: i64) -> RepoResult<()>;
}

// ============================================================================
// Ledgers & Practice
// ============================================================================

#[async_trait]
pub trait PointsHistoryRepo: Send + Sync {
    /// Append-only
    async fn append(&self, entry: &PointsHistoryEntry) -> RepoResult<()>;
    /// Newest first
    async fn recent(&self, user_id: UserId, limit: usize) -> RepoResult<Vec<PointsHistoryEntry>>;
}

#[async_trait]
pub trait DailyStatsRepo: Send + Sync {
    /// Upsert-or-increment keyed by (user, date)
    async fn increment(
        &self,
        user_id: UserId,
        date: NaiveDate,
        delta: &DailyStatsDelta,
    ) -> RepoResult<DailyStats>;
    async fn get(&self, user_id: UserId, date: NaiveDate) -> RepoResult<Option<DailyStats>>;
    /// Rows with `date >= since`, newest first
    async fn since(&self, user_id: UserId, since: NaiveDate) -> RepoResult<Vec<DailyStats>>;
}

#[async_trait]
pub trait ItemProgressRepo: Send + Sync {
    async fn get_all_for_user(&self, kind: ItemKind, user_id: UserId)
        -> RepoResult<Vec<ItemProgress>>;
    async fn upsert(&self, kind: ItemKind, item: &ItemProgress) -> RepoResult<()>;
}

// ============================================================================
// Unified Storage Manager
// ============================================================================

/// Central storage manager that holds all repositories
#[derive(Clone)]
pub struct StorageManager {
    pub profiles: Arc<dyn ProfileRepo>,
    pub lessons: Arc<dyn LessonRepo>,
    pub progress: Arc<dyn ProgressRepo>,
    pub stats: Arc<dyn StatsRepo>,
    pub shields: Arc<dyn ShieldRepo>,
    pub achievements: Arc<dyn AchievementRepo>,
    pub milestones: Arc<dyn MilestoneRepo>,
    pub challenges: Arc<dyn ChallengeRepo>,
    pub points_history: Arc<dyn PointsHistoryRepo>,
    pub daily_stats: Arc<dyn DailyStatsRepo>,
    pub items: Arc<dyn ItemProgressRepo>,
}
