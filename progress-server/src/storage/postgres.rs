//! PostgreSQL Storage - Learning progress persistence
//!
//! Uses `sqlx` for async queries over a shared pool. Methods return raw
//! row types; `postgres_repo_adapter` converts them into core model types.
//!
//! ## Tables
//! - profiles, lessons, user_progress
//! - gamification_stats, streak_shields
//! - achievements, user_achievements, milestone_rewards, user_milestone_completions
//! - daily_challenges, user_challenge_completions
//! - daily_stats, points_history, vocabulary_progress, grammar_progress

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info};

use progress_core::achievements::AchievementRule;
use progress_core::{
    Achievement, DailyChallenge, DailyStatsDelta, GamificationStats, ItemProgress, Lesson,
    MilestoneReward, PointsHistoryEntry, Profile, SectionProgress, UserAchievement,
    UserChallengeCompletion, UserMilestoneCompletion, UserProgress,
};

use super::migrations;
use super::repository::{ItemKind, StoreError};

/// PostgreSQL connection pool wrapper
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl ItemKind {
    fn table(&self) -> &'static str {
        match self {
            ItemKind::Vocabulary => "vocabulary_progress",
            ItemKind::Grammar => "grammar_progress",
        }
    }
}

impl PostgresStore {
    /// Connect to PostgreSQL and run migrations
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connected (max_connections={})", max_connections);

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Wrap an existing pool (tests, shared pools)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name VARCHAR(100) PRIMARY KEY,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, sql) in migrations::get_migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;

            if applied {
                debug!("Migration already applied: {}", name);
                continue;
            }

            info!("Running migration: {}", name);
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(format!("{}: {}", name, e)))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
                .bind(name)
                .execute(&self.pool)
                .await?;

            info!("Migration applied: {}", name);
        }

        Ok(())
    }

    // ========================================================================
    // Profiles & Lessons
    // ========================================================================

    pub async fn get_profile(&self, id: i64) -> Result<Option<ProfileRow>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, points, level, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (id, username, points, level, created_at)
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))",
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(profile.points as i64)
        .bind(&profile.level)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("profile"))?;

        info!("Created profile: {} (id={})", profile.username, profile.id);
        Ok(())
    }

    pub async fn add_profile_points(&self, id: i64, points: u64) -> Result<u64, StoreError> {
        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE profiles SET points = points + $2 WHERE id = $1 RETURNING points",
        )
        .bind(id)
        .bind(points as i64)
        .fetch_optional(&self.pool)
        .await?;

        total
            .map(|t| t as u64)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))
    }

    pub async fn get_lesson(&self, id: i64) -> Result<Option<LessonRow>, StoreError> {
        let row = sqlx::query_as::<_, LessonRow>(
            "SELECT id, title, lesson_type, difficulty FROM lessons WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_all_lessons(&self) -> Result<Vec<LessonRow>, StoreError> {
        let rows = sqlx::query_as::<_, LessonRow>(
            "SELECT id, title, lesson_type, difficulty FROM lessons ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO lessons (id, title, lesson_type, difficulty) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                lesson_type = EXCLUDED.lesson_type,
                difficulty = EXCLUDED.difficulty",
        )
        .bind(lesson.id)
        .bind(&lesson.title)
        .bind(lesson.lesson_type.as_str())
        .bind(lesson.difficulty.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ========================================================================
    // User Progress
    // ========================================================================

    pub async fn get_progress(
        &self,
        user_id: i64,
        lesson_id: i64,
    ) -> Result<Option<ProgressRow>, StoreError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, lesson_id, status, score, time_spent, attempts, section_progress,
                    started_at, completed_at, updated_at
             FROM user_progress WHERE user_id = $1 AND lesson_id = $2",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user_progress(&self, user_id: i64) -> Result<Vec<ProgressRow>, StoreError> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, lesson_id, status, score, time_spent, attempts, section_progress,
                    started_at, completed_at, updated_at
             FROM user_progress WHERE user_id = $1
             ORDER BY completed_at DESC NULLS LAST",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert_progress(&self, progress: &UserProgress) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_progress
                (user_id, lesson_id, status, score, time_spent, attempts, section_progress,
                 started_at, completed_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                status = EXCLUDED.status,
                score = EXCLUDED.score,
                time_spent = EXCLUDED.time_spent,
                attempts = EXCLUDED.attempts,
                section_progress = EXCLUDED.section_progress,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(progress.user_id)
        .bind(progress.lesson_id)
        .bind(progress.status.as_str())
        .bind(progress.score as i16)
        .bind(progress.time_spent as i32)
        .bind(progress.attempts as i32)
        .bind(Json(&progress.section_progress))
        .bind(progress.started_at)
        .bind(progress.completed_at)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(
            user_id = progress.user_id,
            lesson_id = progress.lesson_id,
            status = progress.status.as_str(),
            "Progress upserted"
        );
        Ok(())
    }

    pub async fn count_completed_lessons(&self, user_id: i64) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_progress
             WHERE user_id = $1 AND status IN ('completed', 'mastered')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    // ========================================================================
    // Gamification Stats & Shields
    // ========================================================================

    pub async fn get_stats(&self, user_id: i64) -> Result<Option<StatsRow>, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT user_id, current_streak, longest_streak, total_shields, used_shields,
                    weekly_points, monthly_points, week_start, month_start, last_activity_date
             FROM gamification_stats WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_stats_if_absent(
        &self,
        stats: &GamificationStats,
    ) -> Result<StatsRow, StoreError> {
        sqlx::query(
            "INSERT INTO gamification_stats (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(stats.user_id)
        .execute(&self.pool)
        .await
        .map_err(foreign_key_violation("profile"))?;

        self.get_stats(stats.user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("stats for user {}", stats.user_id)))
    }

    pub async fn update_stats(&self, stats: &GamificationStats) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE gamification_stats SET
                current_streak = $2, longest_streak = $3,
                total_shields = $4, used_shields = $5,
                weekly_points = $6, monthly_points = $7,
                week_start = $8, month_start = $9,
                last_activity_date = $10
             WHERE user_id = $1",
        )
        .bind(stats.user_id)
        .bind(stats.current_streak as i32)
        .bind(stats.longest_streak as i32)
        .bind(stats.total_shields as i32)
        .bind(stats.used_shields as i32)
        .bind(stats.weekly_points as i64)
        .bind(stats.monthly_points as i64)
        .bind(stats.week_start)
        .bind(stats.month_start)
        .bind(stats.last_activity_date)
        .execute(&self.pool)
        .await
        .map_err(check_violation("gamification_stats"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "stats for user {}",
                stats.user_id
            )));
        }
        Ok(())
    }

    pub async fn grant_shield(
        &self,
        user_id: i64,
        earned_at: DateTime<Utc>,
        shield_type: &str,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO streak_shields (user_id, earned_at, shield_type)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(earned_at)
        .bind(shield_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn oldest_unused_shield(
        &self,
        user_id: i64,
    ) -> Result<Option<ShieldRow>, StoreError> {
        let row = sqlx::query_as::<_, ShieldRow>(
            "SELECT id, user_id, earned_at, used_at, is_used, shield_type
             FROM streak_shields WHERE user_id = $1 AND NOT is_used
             ORDER BY earned_at ASC, id ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_shield_used(
        &self,
        shield_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE streak_shields SET is_used = TRUE, used_at = $2
             WHERE id = $1 AND NOT is_used",
        )
        .bind(shield_id)
        .bind(used_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("unused shield {}", shield_id)));
        }
        Ok(())
    }

    pub async fn get_shields(&self, user_id: i64) -> Result<Vec<ShieldRow>, StoreError> {
        let rows = sqlx::query_as::<_, ShieldRow>(
            "SELECT id, user_id, earned_at, used_at, is_used, shield_type
             FROM streak_shields WHERE user_id = $1 ORDER BY earned_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Achievements
    // ========================================================================

    pub async fn get_achievement_catalog(&self) -> Result<Vec<AchievementRow>, StoreError> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            "SELECT id, code, name, description, category, tier, points_required,
                    badge_icon, badge_color, rule
             FROM achievements ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert_achievement(&self, a: &Achievement) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO achievements
                (id, code, name, description, category, tier, points_required,
                 badge_icon, badge_color, rule)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                tier = EXCLUDED.tier,
                points_required = EXCLUDED.points_required,
                badge_icon = EXCLUDED.badge_icon,
                badge_color = EXCLUDED.badge_color,
                rule = EXCLUDED.rule",
        )
        .bind(a.id)
        .bind(&a.code)
        .bind(&a.name)
        .bind(&a.description)
        .bind(a.category.as_str())
        .bind(a.tier.as_str())
        .bind(a.points_required as i64)
        .bind(&a.badge_icon)
        .bind(&a.badge_color)
        .bind(Json(&a.rule))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user_achievements(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserAchievementRow>, StoreError> {
        let rows = sqlx::query_as::<_, UserAchievementRow>(
            "SELECT user_id, achievement_id, earned_at, progress, is_claimed
             FROM user_achievements WHERE user_id = $1 ORDER BY earned_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_user_achievement(&self, ua: &UserAchievement) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_id, earned_at, progress, is_claimed)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, achievement_id) DO NOTHING",
        )
        .bind(ua.user_id)
        .bind(ua.achievement_id)
        .bind(ua.earned_at)
        .bind(ua.progress as i16)
        .bind(ua.is_claimed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Flip `is_claimed` once; `None` when the user never earned it
    pub async fn claim_user_achievement(
        &self,
        user_id: i64,
        achievement_id: i64,
    ) -> Result<Option<bool>, StoreError> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT is_claimed FROM user_achievements WHERE user_id = $1 AND achievement_id = $2",
        )
        .bind(user_id)
        .bind(achievement_id)
        .fetch_optional(&self.pool)
        .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "UPDATE user_achievements SET is_claimed = TRUE
             WHERE user_id = $1 AND achievement_id = $2 AND NOT is_claimed",
        )
        .bind(user_id)
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;
        Ok(Some(result.rows_affected() == 1))
    }

    // ========================================================================
    // Milestones
    // ========================================================================

    pub async fn get_milestone_catalog(&self) -> Result<Vec<MilestoneRow>, StoreError> {
        let rows = sqlx::query_as::<_, MilestoneRow>(
            "SELECT id, name, description, milestone_type, threshold_value, reward_points
             FROM milestone_rewards ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn upsert_milestone(&self, m: &MilestoneReward) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO milestone_rewards
                (id, name, description, milestone_type, threshold_value, reward_points)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                milestone_type = EXCLUDED.milestone_type,
                threshold_value = EXCLUDED.threshold_value,
                reward_points = EXCLUDED.reward_points",
        )
        .bind(m.id)
        .bind(&m.name)
        .bind(&m.description)
        .bind(m.kind.as_str())
        .bind(m.threshold_value as i64)
        .bind(m.reward_points as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_milestone_completions(
        &self,
        user_id: i64,
    ) -> Result<Vec<MilestoneCompletionRow>, StoreError> {
        let rows = sqlx::query_as::<_, MilestoneCompletionRow>(
            "SELECT user_id, milestone_id, completed_at, reward_claimed
             FROM user_milestone_completions WHERE user_id = $1 ORDER BY completed_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_milestone_completion(
        &self,
        c: &UserMilestoneCompletion,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO user_milestone_completions (user_id, milestone_id, completed_at, reward_claimed)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, milestone_id) DO NOTHING",
        )
        .bind(c.user_id)
        .bind(c.milestone_id)
        .bind(c.completed_at)
        .bind(c.reward_claimed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Flip `reward_claimed` once; `None` when the completion does not exist
    pub async fn claim_milestone_reward(
        &self,
        user_id: i64,
        milestone_id: i64,
    ) -> Result<Option<bool>, StoreError> {
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT reward_claimed FROM user_milestone_completions
             WHERE user_id = $1 AND milestone_id = $2",
        )
        .bind(user_id)
        .bind(milestone_id)
        .fetch_optional(&self.pool)
        .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "UPDATE user_milestone_completions SET reward_claimed = TRUE
             WHERE user_id = $1 AND milestone_id = $2 AND NOT reward_claimed",
        )
        .bind(user_id)
        .bind(milestone_id)
        .execute(&self.pool)
        .await?;
        Ok(Some(result.rows_affected() == 1))
    }

    // ========================================================================
    // Daily Challenges
    // ========================================================================

    pub async fn get_challenge(&self, id: i64) -> Result<Option<ChallengeRow>, StoreError> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            "SELECT id, challenge_date, title, description, requirements, reward_points
             FROM daily_challenges WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_challenge_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Option<ChallengeRow>, StoreError> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            "SELECT id, challenge_date, title, description, requirements, reward_points
             FROM daily_challenges WHERE challenge_date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn upsert_challenge(&self, c: &DailyChallenge) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO daily_challenges
                (id, challenge_date, title, description, requirements, reward_points)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                challenge_date = EXCLUDED.challenge_date,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                requirements = EXCLUDED.requirements,
                reward_points = EXCLUDED.reward_points",
        )
        .bind(c.id)
        .bind(c.challenge_date)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.requirements)
        .bind(c.reward_points as i32)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("daily challenge date"))?;
        Ok(())
    }

    pub async fn get_challenge_completion(
        &self,
        user_id: i64,
        challenge_id: i64,
    ) -> Result<Option<ChallengeCompletionRow>, StoreError> {
        let row = sqlx::query_as::<_, ChallengeCompletionRow>(
            "SELECT user_id, challenge_id, points_earned, performance_data, completed_at
             FROM user_challenge_completions WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert_challenge_completion(
        &self,
        c: &UserChallengeCompletion,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO user_challenge_completions
                (user_id, challenge_id, points_earned, performance_data, completed_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, challenge_id) DO NOTHING",
        )
        .bind(c.user_id)
        .bind(c.challenge_id)
        .bind(c.points_earned as i64)
        .bind(&c.performance_data)
        .bind(c.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_challenge_completion(
        &self,
        user_id: i64,
        challenge_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM user_challenge_completions WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ========================================================================
    // Points History & Daily Stats
    // ========================================================================

    pub async fn append_points_history(&self, e: &PointsHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO points_history (user_id, points_earned, points_type, source_id, earned_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(e.user_id)
        .bind(e.points_earned as i64)
        .bind(e.points_type.as_str())
        .bind(&e.source_id)
        .bind(e.earned_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_points_history(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PointsHistoryRow>, StoreError> {
        let rows = sqlx::query_as::<_, PointsHistoryRow>(
            "SELECT user_id, points_earned, points_type, source_id, earned_at
             FROM points_history WHERE user_id = $1
             ORDER BY earned_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn increment_daily_stats(
        &self,
        user_id: i64,
        date: NaiveDate,
        delta: &DailyStatsDelta,
    ) -> Result<DailyStatsRow, StoreError> {
        let row = sqlx::query_as::<_, DailyStatsRow>(
            "INSERT INTO daily_stats
                (user_id, date, lessons_completed, study_time_minutes, perfect_scores, points_earned)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, date) DO UPDATE SET
                lessons_completed = daily_stats.lessons_completed + EXCLUDED.lessons_completed,
                study_time_minutes = daily_stats.study_time_minutes + EXCLUDED.study_time_minutes,
                perfect_scores = daily_stats.perfect_scores + EXCLUDED.perfect_scores,
                points_earned = daily_stats.points_earned + EXCLUDED.points_earned
             RETURNING user_id, date, lessons_completed, study_time_minutes, perfect_scores, points_earned",
        )
        .bind(user_id)
        .bind(date)
        .bind(delta.lessons_completed as i32)
        .bind(delta.study_time_minutes as i32)
        .bind(delta.perfect_scores as i32)
        .bind(delta.points_earned as i64)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_daily_stats(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyStatsRow>, StoreError> {
        let row = sqlx::query_as::<_, DailyStatsRow>(
            "SELECT user_id, date, lessons_completed, study_time_minutes, perfect_scores, points_earned
             FROM daily_stats WHERE user_id = $1 AND date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_daily_stats_since(
        &self,
        user_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<DailyStatsRow>, StoreError> {
        let rows = sqlx::query_as::<_, DailyStatsRow>(
            "SELECT user_id, date, lessons_completed, study_time_minutes, perfect_scores, points_earned
             FROM daily_stats WHERE user_id = $1 AND date >= $2
             ORDER BY date DESC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Vocabulary & Grammar
    // ========================================================================

    pub async fn get_item_progress(
        &self,
        kind: ItemKind,
        user_id: i64,
    ) -> Result<Vec<ItemProgressRow>, StoreError> {
        let sql = format!(
            "SELECT user_id, item_id, mastery_level, difficulty_rating, times_practiced, last_practiced
             FROM {} WHERE user_id = $1 ORDER BY item_id",
            kind.table()
        );
        let rows = sqlx::query_as::<_, ItemProgressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn upsert_item_progress(
        &self,
        kind: ItemKind,
        item: &ItemProgress,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {}
                (user_id, item_id, mastery_level, difficulty_rating, times_practiced, last_practiced)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, item_id) DO UPDATE SET
                mastery_level = EXCLUDED.mastery_level,
                difficulty_rating = EXCLUDED.difficulty_rating,
                times_practiced = EXCLUDED.times_practiced,
                last_practiced = EXCLUDED.last_practiced",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(item.user_id)
            .bind(item.item_id)
            .bind(item.mastery_level as i16)
            .bind(item.difficulty_rating as i16)
            .bind(item.times_practiced as i32)
            .bind(item.last_practiced)
            .execute(&self.pool)
            .await
            .map_err(check_violation(kind.table()))?;
        Ok(())
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn db_error_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn map_code(
    code: &'static str,
    what: &'static str,
) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        if db_error_code(&e).as_deref() == Some(code) {
            StoreError::Constraint(format!("{}: {}", what, e))
        } else {
            StoreError::Database(e)
        }
    }
}

fn unique_violation(what: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    map_code("23505", what)
}

fn foreign_key_violation(what: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    map_code("23503", what)
}

fn check_violation(what: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    map_code("23514", what)
}

// ============================================================================
// Row Types (for sqlx FromRow)
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub username: String,
    pub points: i64,
    pub level: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LessonRow {
    pub id: i64,
    pub title: String,
    pub lesson_type: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub user_id: i64,
    pub lesson_id: i64,
    pub status: String,
    pub score: i16,
    pub time_spent: i32,
    pub attempts: i32,
    pub section_progress: Json<Vec<SectionProgress>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub user_id: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub total_shields: i32,
    pub used_shields: i32,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub week_start: Option<NaiveDate>,
    pub month_start: Option<NaiveDate>,
    pub last_activity_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ShieldRow {
    pub id: i64,
    pub user_id: i64,
    pub earned_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_used: bool,
    pub shield_type: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tier: String,
    pub points_required: i64,
    pub badge_icon: String,
    pub badge_color: String,
    pub rule: Json<AchievementRule>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserAchievementRow {
    pub user_id: i64,
    pub achievement_id: i64,
    pub earned_at: DateTime<Utc>,
    pub progress: i16,
    pub is_claimed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct MilestoneRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub milestone_type: String,
    pub threshold_value: i64,
    pub reward_points: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MilestoneCompletionRow {
    pub user_id: i64,
    pub milestone_id: i64,
    pub completed_at: DateTime<Utc>,
    pub reward_claimed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChallengeRow {
    pub id: i64,
    pub challenge_date: NaiveDate,
    pub title: String,
    pub description: String,
    pub requirements: serde_json::Value,
    pub reward_points: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChallengeCompletionRow {
    pub user_id: i64,
    pub challenge_id: i64,
    pub points_earned: i64,
    pub performance_data: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DailyStatsRow {
    pub user_id: i64,
    pub date: NaiveDate,
    pub lessons_completed: i32,
    pub study_time_minutes: i32,
    pub perfect_scores: i32,
    pub points_earned: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PointsHistoryRow {
    pub user_id: i64,
    pub points_earned: i64,
    pub points_type: String,
    pub source_id: Option<String>,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemProgressRow {
    pub user_id: i64,
    pub item_id: i64,
    pub mastery_level: i16,
    pub difficulty_rating: i16,
    pub times_practiced: i32,
    pub last_practiced: Option<DateTime<Utc>>,
}
