//! PostgreSQL Repository Adapters
//!
//! Implements the Repository traits from `repository.rs` using PostgresStore
//! as the backend. Converts between SQL row types and core model types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use progress_core::{
    Achievement, DailyChallenge, DailyStats, DailyStatsDelta, GamificationStats, ItemProgress,
    Lesson, LessonId, MilestoneReward, PointsHistoryEntry, Profile, StreakShield,
    UserAchievement, UserChallengeCompletion, UserId, UserMilestoneCompletion, UserProgress,
};

use super::postgres::*;
use super::repository::*;

// ============================================================================
// Type Conversion Helpers
// ============================================================================

fn row_to_profile(row: ProfileRow) -> Profile {
    Profile {
        id: row.id,
        username: row.username,
        points: row.points.max(0) as u64,
        level: row.level,
        created_at: row.created_at,
    }
}

fn row_to_lesson(row: LessonRow) -> RepoResult<Lesson> {
    Ok(Lesson {
        id: row.id,
        title: row.title,
        lesson_type: row.lesson_type.parse()?,
        difficulty: row.difficulty.parse()?,
    })
}

fn row_to_progress(row: ProgressRow) -> RepoResult<UserProgress> {
    Ok(UserProgress {
        user_id: row.user_id,
        lesson_id: row.lesson_id,
        status: row.status.parse()?,
        score: row.score.clamp(0, 100) as u8,
        time_spent: row.time_spent.max(0) as u32,
        attempts: row.attempts.max(0) as u32,
        section_progress: row.section_progress.0,
        started_at: row.started_at,
        completed_at: row.completed_at,
        updated_at: row.updated_at,
    })
}

fn row_to_stats(row: StatsRow) -> GamificationStats {
    GamificationStats {
        user_id: row.user_id,
        current_streak: row.current_streak.max(0) as u32,
        longest_streak: row.longest_streak.max(0) as u32,
        total_shields: row.total_shields.max(0) as u32,
        used_shields: row.used_shields.max(0) as u32,
        weekly_points: row.weekly_points.max(0) as u64,
        monthly_points: row.monthly_points.max(0) as u64,
        week_start: row.week_start,
        month_start: row.month_start,
        last_activity_date: row.last_activity_date,
    }
}

fn row_to_shield(row: ShieldRow) -> StreakShield {
    StreakShield {
        id: row.id,
        user_id: row.user_id,
        earned_at: row.earned_at,
        used_at: row.used_at,
        is_used: row.is_used,
        shield_type: row.shield_type,
    }
}

fn row_to_achievement(row: AchievementRow) -> RepoResult<Achievement> {
    Ok(Achievement {
        id: row.id,
        code: row.code,
        name: row.name,
        description: row.description,
        category: row.category.parse()?,
        tier: row.tier.parse()?,
        points_required: row.points_required.max(0) as u64,
        badge_icon: row.badge_icon,
        badge_color: row.badge_color,
        rule: row.rule.0,
    })
}

fn row_to_user_achievement(row: UserAchievementRow) -> UserAchievement {
    UserAchievement {
        user_id: row.user_id,
        achievement_id: row.achievement_id,
        earned_at: row.earned_at,
        progress: row.progress.clamp(0, 100) as u8,
        is_claimed: row.is_claimed,
    }
}

fn row_to_milestone(row: MilestoneRow) -> RepoResult<MilestoneReward> {
    Ok(MilestoneReward {
        id: row.id,
        name: row.name,
        description: row.description,
        kind: row.milestone_type.parse()?,
        threshold_value: row.threshold_value.max(0) as u64,
        reward_points: row.reward_points.max(0) as u64,
    })
}

fn row_to_milestone_completion(row: MilestoneCompletionRow) -> UserMilestoneCompletion {
    UserMilestoneCompletion {
        user_id: row.user_id,
        milestone_id: row.milestone_id,
        completed_at: row.completed_at,
        reward_claimed: row.reward_claimed,
    }
}

fn row_to_challenge(row: ChallengeRow) -> DailyChallenge {
    DailyChallenge {
        id: row.id,
        challenge_date: row.challenge_date,
        title: row.title,
        description: row.description,
        requirements: row.requirements,
        reward_points: row.reward_points.max(0) as u32,
    }
}

fn row_to_challenge_completion(row: ChallengeCompletionRow) -> UserChallengeCompletion {
    UserChallengeCompletion {
        user_id: row.user_id,
        challenge_id: row.challenge_id,
        points_earned: row.points_earned.max(0) as u64,
        performance_data: row.performance_data,
        completed_at: row.completed_at,
    }
}

fn row_to_daily_stats(row: DailyStatsRow) -> DailyStats {
    DailyStats {
        user_id: row.user_id,
        date: row.date,
        lessons_completed: row.lessons_completed.max(0) as u32,
        study_time_minutes: row.study_time_minutes.max(0) as u32,
        perfect_scores: row.perfect_scores.max(0) as u32,
        points_earned: row.points_earned.max(0) as u64,
    }
}

fn row_to_points_entry(row: PointsHistoryRow) -> RepoResult<PointsHistoryEntry> {
    Ok(PointsHistoryEntry {
        user_id: row.user_id,
        points_earned: row.points_earned.max(0) as u64,
        points_type: row.points_type.parse()?,
        source_id: row.source_id,
        earned_at: row.earned_at,
    })
}

fn row_to_item(row: ItemProgressRow) -> ItemProgress {
    ItemProgress {
        user_id: row.user_id,
        item_id: row.item_id,
        mastery_level: row.mastery_level.clamp(0, 5) as u8,
        difficulty_rating: row.difficulty_rating.clamp(0, 5) as u8,
        times_practiced: row.times_practiced.max(0) as u32,
        last_practiced: row.last_practiced,
    }
}

// ============================================================================
// Repository Adapters
// ============================================================================

pub struct PgProfileRepo {
    store: Arc<PostgresStore>,
}

impl PgProfileRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Profile>> {
        Ok(self.store.get_profile(user_id).await?.map(row_to_profile))
    }

    async fn create(&self, profile: &Profile) -> RepoResult<()> {
        self.store.create_profile(profile).await
    }

    async fn add_points(&self, user_id: UserId, points: u64) -> RepoResult<u64> {
        self.store.add_profile_points(user_id, points).await
    }
}

pub struct PgLessonRepo {
    store: Arc<PostgresStore>,
}

impl PgLessonRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LessonRepo for PgLessonRepo {
    async fn get(&self, lesson_id: LessonId) -> RepoResult<Option<Lesson>> {
        self.store
            .get_lesson(lesson_id)
            .await?
            .map(row_to_lesson)
            .transpose()
    }

    async fn get_all(&self) -> RepoResult<Vec<Lesson>> {
        self.store
            .get_all_lessons()
            .await?
            .into_iter()
            .map(row_to_lesson)
            .collect()
    }

    async fn upsert(&self, lesson: &Lesson) -> RepoResult<()> {
        self.store.upsert_lesson(lesson).await
    }
}

pub struct PgProgressRepo {
    store: Arc<PostgresStore>,
}

impl PgProgressRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProgressRepo for PgProgressRepo {
    async fn get(&self, user_id: UserId, lesson_id: LessonId) -> RepoResult<Option<UserProgress>> {
        self.store
            .get_progress(user_id, lesson_id)
            .await?
            .map(row_to_progress)
            .transpose()
    }

    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<UserProgress>> {
        self.store
            .get_user_progress(user_id)
            .await?
            .into_iter()
            .map(row_to_progress)
            .collect()
    }

    async fn upsert(&self, progress: &UserProgress) -> RepoResult<()> {
        self.store.upsert_progress(progress).await
    }

    async fn count_completed(&self, user_id: UserId) -> RepoResult<u64> {
        self.store.count_completed_lessons(user_id).await
    }
}

pub struct PgStatsRepo {
    store: Arc<PostgresStore>,
}

impl PgStatsRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatsRepo for PgStatsRepo {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<GamificationStats>> {
        Ok(self.store.get_stats(user_id).await?.map(row_to_stats))
    }

    async fn create_if_absent(&self, stats: &GamificationStats) -> RepoResult<GamificationStats> {
        Ok(row_to_stats(self.store.create_stats_if_absent(stats).await?))
    }

    async fn update(&self, stats: &GamificationStats) -> RepoResult<()> {
        self.store.update_stats(stats).await
    }
}

pub struct PgShieldRepo {
    store: Arc<PostgresStore>,
}

impl PgShieldRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ShieldRepo for PgShieldRepo {
    async fn grant(
        &self,
        user_id: UserId,
        earned_at: DateTime<Utc>,
        shield_type: &str,
    ) -> RepoResult<i64> {
        self.store.grant_shield(user_id, earned_at, shield_type).await
    }

    async fn oldest_unused(&self, user_id: UserId) -> RepoResult<Option<StreakShield>> {
        Ok(self
            .store
            .oldest_unused_shield(user_id)
            .await?
            .map(row_to_shield))
    }

    async fn mark_used(&self, shield_id: i64, used_at: DateTime<Utc>) -> RepoResult<()> {
        self.store.mark_shield_used(shield_id, used_at).await
    }

    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<StreakShield>> {
        Ok(self
            .store
            .get_shields(user_id)
            .await?
            .into_iter()
            .map(row_to_shield)
            .collect())
    }
}

pub struct PgAchievementRepo {
    store: Arc<PostgresStore>,
}

impl PgAchievementRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AchievementRepo for PgAchievementRepo {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>> {
        self.store
            .get_achievement_catalog()
            .await?
            .into_iter()
            .map(row_to_achievement)
            .collect()
    }

    async fn upsert_definition(&self, achievement: &Achievement) -> RepoResult<()> {
        self.store.upsert_achievement(achievement).await
    }

    async fn earned(&self, user_id: UserId) -> RepoResult<Vec<UserAchievement>> {
        Ok(self
            .store
            .get_user_achievements(user_id)
            .await?
            .into_iter()
            .map(row_to_user_achievement)
            .collect())
    }

    async fn insert_if_absent(&self, earned: &UserAchievement) -> RepoResult<bool> {
        self.store.insert_user_achievement(earned).await
    }

    async fn mark_claimed(&self, user_id: UserId, achievement_id: i64) -> RepoResult<bool> {
        self.store
            .claim_user_achievement(user_id, achievement_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "achievement {} for user {}",
                    achievement_id, user_id
                ))
            })
    }
}

pub struct PgMilestoneRepo {
    store: Arc<PostgresStore>,
}

impl PgMilestoneRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MilestoneRepo for PgMilestoneRepo {
    async fn catalog(&self) -> RepoResult<Vec<MilestoneReward>> {
        self.store
            .get_milestone_catalog()
            .await?
            .into_iter()
            .map(row_to_milestone)
            .collect()
    }

    async fn upsert_definition(&self, milestone: &MilestoneReward) -> RepoResult<()> {
        self.store.upsert_milestone(milestone).await
    }

    async fn completed(&self, user_id: UserId) -> RepoResult<Vec<UserMilestoneCompletion>> {
        Ok(self
            .store
            .get_milestone_completions(user_id)
            .await?
            .into_iter()
            .map(row_to_milestone_completion)
            .collect())
    }

    async fn insert_if_absent(&self, completion: &UserMilestoneCompletion) -> RepoResult<bool> {
        self.store.insert_milestone_completion(completion).await
    }

    async fn mark_reward_claimed(&self, user_id: UserId, milestone_id: i64) -> RepoResult<bool> {
        self.store
            .claim_milestone_reward(user_id, milestone_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("milestone {} for user {}", milestone_id, user_id))
            })
    }
}

pub struct PgChallengeRepo {
    store: Arc<PostgresStore>,
}

impl PgChallengeRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChallengeRepo for PgChallengeRepo {
    async fn get(&self, challenge_id: i64) -> RepoResult<Option<DailyChallenge>> {
        Ok(self
            .store
            .get_challenge(challenge_id)
            .await?
            .map(row_to_challenge))
    }

    async fn for_date(&self, date: NaiveDate) -> RepoResult<Option<DailyChallenge>> {
        Ok(self
            .store
            .get_challenge_for_date(date)
            .await?
            .map(row_to_challenge))
    }

    async fn upsert(&self, challenge: &DailyChallenge) -> RepoResult<()> {
        self.store.upsert_challenge(challenge).await
    }

    async fn completion(
        &self,
        user_id: UserId,
        challenge_id: i64,
    ) -> RepoResult<Option<UserChallengeCompletion>> {
        Ok(self
            .store
            .get_challenge_completion(user_id, challenge_id)
            .await?
            .map(row_to_challenge_completion))
    }

    async fn insert_completion_if_absent(
        &self,
        completion: &UserChallengeCompletion,
    ) -> RepoResult<bool> {
        self.store.insert_challenge_completion(completion).await
    }

    async fn remove_completion(&self, user_id: UserId, challenge_id: i64) -> RepoResult<()> {
        self.store
            .delete_challenge_completion(user_id, challenge_id)
            .await
    }
}

pub struct PgPointsHistoryRepo {
    store: Arc<PostgresStore>,
}

impl PgPointsHistoryRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PointsHistoryRepo for PgPointsHistoryRepo {
    async fn append(&self, entry: &PointsHistoryEntry) -> RepoResult<()> {
        self.store.append_points_history(entry).await
    }

    async fn recent(&self, user_id: UserId, limit: usize) -> RepoResult<Vec<PointsHistoryEntry>> {
        self.store
            .get_points_history(user_id, limit)
            .await?
            .into_iter()
            .map(row_to_points_entry)
            .collect()
    }
}

pub struct PgDailyStatsRepo {
    store: Arc<PostgresStore>,
}

impl PgDailyStatsRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DailyStatsRepo for PgDailyStatsRepo {
    async fn increment(
        &self,
        user_id: UserId,
        date: NaiveDate,
        delta: &DailyStatsDelta,
    ) -> RepoResult<DailyStats> {
        Ok(row_to_daily_stats(
            self.store.increment_daily_stats(user_id, date, delta).await?,
        ))
    }

    async fn get(&self, user_id: UserId, date: NaiveDate) -> RepoResult<Option<DailyStats>> {
        Ok(self
            .store
            .get_daily_stats(user_id, date)
            .await?
            .map(row_to_daily_stats))
    }

    async fn since(&self, user_id: UserId, since: NaiveDate) -> RepoResult<Vec<DailyStats>> {
        Ok(self
            .store
            .get_daily_stats_since(user_id, since)
            .await?
            .into_iter()
            .map(row_to_daily_stats)
            .collect())
    }
}

pub struct PgItemProgressRepo {
    store: Arc<PostgresStore>,
}

impl PgItemProgressRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemProgressRepo for PgItemProgressRepo {
    async fn get_all_for_user(
        &self,
        kind: ItemKind,
        user_id: UserId,
    ) -> RepoResult<Vec<ItemProgress>> {
        Ok(self
            .store
            .get_item_progress(kind, user_id)
            .await?
            .into_iter()
            .map(row_to_item)
            .collect())
    }

    async fn upsert(&self, kind: ItemKind, item: &ItemProgress) -> RepoResult<()> {
        self.store.upsert_item_progress(kind, item).await
    }
}

impl StorageManager {
    /// Wire every repository to one PostgreSQL store
    pub fn postgres(pg: Arc<PostgresStore>) -> Self {
        Self {
            profiles: Arc::new(PgProfileRepo::new(pg.clone())),
            lessons: Arc::new(PgLessonRepo::new(pg.clone())),
            progress: Arc::new(PgProgressRepo::new(pg.clone())),
            stats: Arc::new(PgStatsRepo::new(pg.clone())),
            shields: Arc::new(PgShieldRepo::new(pg.clone())),
            achievements: Arc::new(PgAchievementRepo::new(pg.clone())),
            milestones: Arc::new(PgMilestoneRepo::new(pg.clone())),
            challenges: Arc::new(PgChallengeRepo::new(pg.clone())),
            points_history: Arc::new(PgPointsHistoryRepo::new(pg.clone())),
            daily_stats: Arc::new(PgDailyStatsRepo::new(pg.clone())),
            items: Arc::new(PgItemProgressRepo::new(pg)),
        }
    }
}
