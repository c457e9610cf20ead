//! Gamification service: points, streaks, achievements, milestones and the
//! daily challenge, persisted through the [`StorageManager`].
//!
//! The rule decisions come from `progress_core`; this layer only loads the
//! rows a rule needs, applies the decision and writes it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use progress_core::achievements::{self, RuleContext};
use progress_core::constants::STREAK_SHIELD_TYPE;
use progress_core::milestones::{self, Level, MilestoneMetrics};
use progress_core::points::{self, PointsCalculation};
use progress_core::streak::{self, StreakDecision, StreakTransition};
use progress_core::{
    Achievement, ActivityData, ActivityResult, ActivityType, DailyChallenge, DailyStatsDelta,
    GamificationStats, MilestoneReward, PointsHistoryEntry, UserAchievement,
    UserChallengeCompletion, UserId, UserMilestoneCompletion,
};

use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{StorageManager, StoreError};

/// Outcome of one points award
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsAward {
    pub calculation: PointsCalculation,
    /// Profile points after the award
    pub total_points: u64,
    pub achievements_unlocked: Vec<Achievement>,
    pub milestones_reached: Vec<MilestoneReward>,
}

/// An earned achievement joined with its catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub achievement: Achievement,
    pub earned_at: DateTime<Utc>,
    pub is_claimed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementOverview {
    pub earned: Vec<EarnedAchievement>,
    pub catalog_size: usize,
    /// 0-100
    pub completion_percent: f32,
}

pub struct GamificationService {
    storage: StorageManager,
    clock: Arc<dyn Clock>,
}

impl GamificationService {
    pub fn new(storage: StorageManager, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub async fn get_or_create_stats(&self, user_id: UserId) -> ServiceResult<GamificationStats> {
        if let Some(stats) = self.storage.stats.get(user_id).await? {
            return Ok(stats);
        }
        debug!(user_id, "Creating gamification stats");
        Ok(self
            .storage
            .stats
            .create_if_absent(&GamificationStats::new(user_id))
            .await?)
    }

    // ========================================================================
    // Points
    // ========================================================================

    /// Award points for one activity.
    ///
    /// Credits the profile and the weekly/monthly counters, then runs the
    /// achievement and milestone engines against the new totals. Once the
    /// profile is credited the call succeeds: counter and engine failures are
    /// logged, and the engines leave their lists empty.
    pub async fn calculate_points(
        &self,
        user_id: UserId,
        activity_type: ActivityType,
        base_points: u32,
        data: &ActivityData,
    ) -> ServiceResult<PointsAward> {
        if self.storage.profiles.get(user_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("profile {}", user_id)));
        }
        let mut stats = self.get_or_create_stats(user_id).await?;

        let calculation = points::calculate(activity_type, base_points, data, stats.current_streak);
        let total_points = self
            .storage
            .profiles
            .add_points(user_id, calculation.total)
            .await?;

        points::accrue_period_points(&mut stats, self.clock.today(), calculation.total);
        if let Err(e) = self.storage.stats.update(&stats).await {
            warn!(user_id, error = %e, "Period counters not updated after award");
        }

        info!(
            user_id,
            activity = %activity_type,
            points = calculation.total,
            multiplier = calculation.streak_multiplier,
            total_points,
            "Points awarded"
        );

        let achievements_unlocked = match self
            .unlock_achievements(user_id, data, &stats, total_points)
            .await
        {
            Ok(unlocked) => unlocked,
            Err(e) => {
                warn!(user_id, error = %e, "Achievement check after award failed");
                Vec::new()
            }
        };
        let milestones_reached = match self.check_milestones(user_id).await {
            Ok(reached) => reached,
            Err(e) => {
                warn!(user_id, error = %e, "Milestone check after award failed");
                Vec::new()
            }
        };

        Ok(PointsAward {
            calculation,
            total_points,
            achievements_unlocked,
            milestones_reached,
        })
    }

    // ========================================================================
    // Streak
    // ========================================================================

    /// Record activity at `activity_at` against the daily streak
    pub async fn update_streak(
        &self,
        user_id: UserId,
        activity_at: DateTime<Utc>,
    ) -> ServiceResult<StreakDecision> {
        let mut stats = self.get_or_create_stats(user_id).await?;

        let mut decision = streak::evaluate(&stats, activity_at, false);
        let mut shield = None;
        if decision.transition == StreakTransition::Reset {
            shield = self.storage.shields.oldest_unused(user_id).await?;
            if shield.is_some() {
                decision = streak::evaluate(&stats, activity_at, true);
            }
        }

        if !decision.streak_updated() {
            debug!(user_id, "Activity on same day, streak unchanged");
            return Ok(decision);
        }

        streak::apply(&mut stats, &decision, activity_at);

        if let (true, Some(shield)) = (decision.shield_consumed, shield.as_ref()) {
            self.storage.shields.mark_used(shield.id, activity_at).await?;
            info!(user_id, shield_id = shield.id, streak = stats.current_streak, "Streak shield consumed");
        }
        if decision.shield_earned {
            let shield_id = self
                .storage
                .shields
                .grant(user_id, activity_at, STREAK_SHIELD_TYPE)
                .await?;
            info!(user_id, shield_id, streak = stats.current_streak, "Streak shield earned");
        }

        self.storage.stats.update(&stats).await?;
        debug!(
            user_id,
            transition = ?decision.transition,
            streak = stats.current_streak,
            "Streak updated"
        );
        Ok(decision)
    }

    // ========================================================================
    // Achievements
    // ========================================================================

    /// Evaluate the catalog for one activity and persist any new unlocks
    pub async fn check_and_unlock(
        &self,
        user_id: UserId,
        data: &ActivityData,
    ) -> ServiceResult<Vec<Achievement>> {
        let (profile, stats) = tokio::try_join!(
            self.storage.profiles.get(user_id),
            self.storage.stats.get(user_id),
        )?;
        let profile = profile.ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))?;
        let stats = stats.unwrap_or_else(|| GamificationStats::new(user_id));
        self.unlock_achievements(user_id, data, &stats, profile.points)
            .await
    }

    async fn unlock_achievements(
        &self,
        user_id: UserId,
        data: &ActivityData,
        stats: &GamificationStats,
        total_points: u64,
    ) -> ServiceResult<Vec<Achievement>> {
        let (earned, catalog) = tokio::try_join!(
            self.storage.achievements.earned(user_id),
            self.storage.achievements.catalog(),
        )?;
        let earned: HashSet<i64> = earned.iter().map(|e| e.achievement_id).collect();
        let ctx = RuleContext {
            activity: data,
            stats,
            total_points,
        };

        let now = self.clock.now();
        let mut unlocked = Vec::new();
        for achievement in achievements::evaluate_unlocks(&catalog, &earned, &ctx) {
            let row = UserAchievement {
                user_id,
                achievement_id: achievement.id,
                earned_at: now,
                progress: 100,
                is_claimed: false,
            };
            if self.storage.achievements.insert_if_absent(&row).await? {
                info!(user_id, code = %achievement.code, "Achievement unlocked");
                unlocked.push(achievement.clone());
            }
        }
        Ok(unlocked)
    }

    pub async fn list_user_achievements(&self, user_id: UserId) -> ServiceResult<AchievementOverview> {
        let (earned, catalog) = tokio::try_join!(
            self.storage.achievements.earned(user_id),
            self.storage.achievements.catalog(),
        )?;

        let mut rows: Vec<EarnedAchievement> = earned
            .into_iter()
            .filter_map(|e| {
                catalog
                    .iter()
                    .find(|a| a.id == e.achievement_id)
                    .map(|a| EarnedAchievement {
                        achievement: a.clone(),
                        earned_at: e.earned_at,
                        is_claimed: e.is_claimed,
                    })
            })
            .collect();
        rows.sort_by_key(|r| r.earned_at);

        Ok(AchievementOverview {
            completion_percent: achievements::completion_percent(catalog.len(), rows.len()),
            catalog_size: catalog.len(),
            earned: rows,
        })
    }

    pub async fn claim_achievement(&self, user_id: UserId, achievement_id: i64) -> ServiceResult<()> {
        match self
            .storage
            .achievements
            .mark_claimed(user_id, achievement_id)
            .await
        {
            Ok(true) => {
                info!(user_id, achievement_id, "Achievement claimed");
                Ok(())
            }
            Ok(false) => Err(ServiceError::AlreadyClaimed(format!(
                "achievement {}",
                achievement_id
            ))),
            Err(StoreError::NotFound(what)) => Err(ServiceError::NotFound(what)),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Milestones
    // ========================================================================

    /// Evaluate milestone thresholds and persist new completions
    pub async fn check_milestones(&self, user_id: UserId) -> ServiceResult<Vec<MilestoneReward>> {
        let (profile, stats, earned, completed, catalog) = tokio::try_join!(
            self.storage.profiles.get(user_id),
            self.storage.stats.get(user_id),
            self.storage.achievements.earned(user_id),
            self.storage.milestones.completed(user_id),
            self.storage.milestones.catalog(),
        )?;
        let profile = profile.ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))?;

        let metrics = MilestoneMetrics {
            points: profile.points,
            current_streak: stats.map(|s| s.current_streak).unwrap_or(0),
            level_rank: Level::rank_of(&profile.level),
            achievement_count: earned.len() as u64,
        };
        let completed: HashSet<i64> = completed.iter().map(|c| c.milestone_id).collect();

        let now = self.clock.now();
        let mut reached = Vec::new();
        for milestone in milestones::evaluate_reached(&catalog, &completed, &metrics) {
            let row = UserMilestoneCompletion {
                user_id,
                milestone_id: milestone.id,
                completed_at: now,
                reward_claimed: false,
            };
            if self.storage.milestones.insert_if_absent(&row).await? {
                info!(user_id, milestone = %milestone.name, "Milestone reached");
                reached.push(milestone.clone());
            }
        }
        Ok(reached)
    }

    /// Mark a reached milestone's reward as claimed and credit its points.
    /// Returns the profile's new point total.
    pub async fn claim_milestone_reward(
        &self,
        user_id: UserId,
        milestone_id: i64,
    ) -> ServiceResult<u64> {
        let catalog = self.storage.milestones.catalog().await?;
        let milestone = catalog
            .into_iter()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| ServiceError::NotFound(format!("milestone {}", milestone_id)))?;

        match self
            .storage
            .milestones
            .mark_reward_claimed(user_id, milestone_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                return Err(ServiceError::AlreadyClaimed(format!("milestone {}", milestone_id)))
            }
            Err(StoreError::NotFound(what)) => return Err(ServiceError::NotFound(what)),
            Err(e) => return Err(e.into()),
        }

        let total = self
            .storage
            .profiles
            .add_points(user_id, milestone.reward_points)
            .await?;
        info!(user_id, milestone_id, reward = milestone.reward_points, "Milestone reward claimed");
        Ok(total)
    }

    // ========================================================================
    // Daily challenge
    // ========================================================================

    pub async fn today_challenge(&self) -> ServiceResult<Option<DailyChallenge>> {
        Ok(self.storage.challenges.for_date(self.clock.today()).await?)
    }

    /// Complete a challenge at most once per user.
    ///
    /// Awards `daily_challenge` points with the challenge's reward as base and
    /// the streak bonus when the user currently holds a streak. The completion
    /// row is released again if the award fails, so the challenge stays open.
    /// History and daily stats are logged on failure and not propagated.
    pub async fn complete_daily_challenge(
        &self,
        user_id: UserId,
        challenge_id: i64,
        performance: serde_json::Value,
    ) -> ServiceResult<ActivityResult> {
        let challenge = self
            .storage
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("challenge {}", challenge_id)))?;

        if self
            .storage
            .challenges
            .completion(user_id, challenge_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyCompleted(format!("challenge {}", challenge_id)));
        }

        let stats = self.get_or_create_stats(user_id).await?;
        let data = ActivityData {
            accuracy: performance.get("accuracy").and_then(|v| v.as_f64()),
            has_streak: stats.current_streak > 0,
            activity_type: Some(ActivityType::DailyChallenge),
            ..Default::default()
        };
        let preview = points::calculate(
            ActivityType::DailyChallenge,
            challenge.reward_points,
            &data,
            stats.current_streak,
        );

        let now = self.clock.now();
        let claimed = self
            .storage
            .challenges
            .insert_completion_if_absent(&UserChallengeCompletion {
                user_id,
                challenge_id,
                points_earned: preview.total,
                performance_data: performance,
                completed_at: now,
            })
            .await?;
        if !claimed {
            return Err(ServiceError::AlreadyCompleted(format!("challenge {}", challenge_id)));
        }

        let award = match self
            .calculate_points(
                user_id,
                ActivityType::DailyChallenge,
                challenge.reward_points,
                &data,
            )
            .await
        {
            Ok(award) => award,
            Err(e) => {
                // Release the claim so a retry can still earn the reward
                if let Err(release) = self
                    .storage
                    .challenges
                    .remove_completion(user_id, challenge_id)
                    .await
                {
                    warn!(user_id, challenge_id, error = %release, "Failed to release challenge completion");
                }
                return Err(e);
            }
        };

        let entry = PointsHistoryEntry {
            user_id,
            points_earned: award.calculation.total,
            points_type: ActivityType::DailyChallenge,
            source_id: Some(challenge_id.to_string()),
            earned_at: now,
        };
        if let Err(e) = self.storage.points_history.append(&entry).await {
            warn!(user_id, challenge_id, error = %e, "Challenge points history append failed");
        }
        let delta = DailyStatsDelta {
            points_earned: award.calculation.total,
            ..Default::default()
        };
        if let Err(e) = self
            .storage
            .daily_stats
            .increment(user_id, self.clock.today(), &delta)
            .await
        {
            warn!(user_id, challenge_id, error = %e, "Challenge daily stats update failed");
        }

        info!(user_id, challenge_id, points = award.calculation.total, "Daily challenge completed");
        Ok(ActivityResult {
            points_earned: award.calculation.total,
            achievements_unlocked: award.achievements_unlocked,
            milestones_reached: award.milestones_reached,
            streak_updated: false,
            feedback: "Défi relevé ! Challenge complete!".into(),
        })
    }
}
