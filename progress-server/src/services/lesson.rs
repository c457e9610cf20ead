//! Lesson Completion Orchestrator
//!
//! Completing a lesson is a saga of store writes with exactly one
//! authoritative step:
//!
//! ```text
//! 1. upsert progress (completed)      authoritative, failure aborts
//! 2. load lesson + today's context    best-effort
//! 3. award points (50 base)           best-effort, runs achievements + milestones
//! 4. append points history            best-effort
//! 5. increment today's daily stats    best-effort
//! 6. achievement check                best-effort
//! 7. streak update                    best-effort
//! ```
//!
//! Steps 2-7 never roll back step 1. A failed step is logged, counted and
//! reported in [`LessonCompletion::failed_steps`]; the call still succeeds.
//! The streak moves last, so the points multiplier sees the streak as it was
//! before this lesson.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use progress_core::constants::{LESSON_COMPLETION_BASE_POINTS, PERFECT_SCORE};
use progress_core::points;
use progress_core::{
    ActivityData, ActivityResult, ActivityType, DailyStats, DailyStatsDelta, Lesson, LessonId,
    LessonStatus, PointsHistoryEntry, UserId, UserProgress,
};

use super::gamification::GamificationService;
use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::ServerMetrics;
use crate::storage::StorageManager;

/// Best-effort steps of the completion saga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    LessonLookup,
    AwardPoints,
    RecordHistory,
    RecordDailyStats,
    CheckAchievements,
    UpdateStreak,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessonLookup => "lesson_lookup",
            Self::AwardPoints => "award_points",
            Self::RecordHistory => "record_history",
            Self::RecordDailyStats => "record_daily_stats",
            Self::CheckAchievements => "check_achievements",
            Self::UpdateStreak => "update_streak",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub completed: bool,
    pub result: ActivityResult,
    pub failed_steps: Vec<SagaStep>,
}

/// Context read before awarding points
#[derive(Default)]
struct CompletionContext {
    lesson: Option<Lesson>,
    today: Option<DailyStats>,
    finished_lessons: u64,
}

pub struct LessonService {
    storage: StorageManager,
    gamification: Arc<GamificationService>,
    metrics: Arc<ServerMetrics>,
    clock: Arc<dyn Clock>,
}

impl LessonService {
    pub fn new(
        storage: StorageManager,
        gamification: Arc<GamificationService>,
        metrics: Arc<ServerMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            gamification,
            metrics,
            clock,
        }
    }

    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        score: u8,
        time_spent: u32,
    ) -> ServiceResult<LessonCompletion> {
        if score > 100 {
            return Err(ServiceError::InvalidInput(format!("score {} is outside 0-100", score)));
        }
        let now = self.clock.now();
        let today = self.clock.today();
        let mut failed = Vec::new();

        // 1. Authoritative progress write
        let existing = self.storage.progress.get(user_id, lesson_id).await?;
        let progress = completed_progress(existing, user_id, lesson_id, score, time_spent, now);
        self.storage.progress.upsert(&progress).await?;
        self.metrics.record_lesson_completed();
        info!(user_id, lesson_id, score, time_spent, "Lesson completed");

        // 2. Context
        let context = self
            .best_effort(
                SagaStep::LessonLookup,
                user_id,
                self.load_context(user_id, lesson_id, today).await,
                &mut failed,
            )
            .unwrap_or_default();

        let is_perfect_score = score >= PERFECT_SCORE;
        let data = ActivityData {
            is_perfect_score,
            activity_type: Some(ActivityType::LessonCompletion),
            lesson_completed: true,
            is_first_lesson: context.finished_lessons == 1,
            lessons_completed_today: context
                .today
                .as_ref()
                .map(|d| d.lessons_completed)
                .unwrap_or(0)
                + 1,
            lesson_id: Some(lesson_id),
            difficulty: context.lesson.as_ref().map(|l| l.difficulty),
            ..Default::default()
        };

        // 3. Points (+ achievements and milestones against the new totals)
        let award = self.best_effort(
            SagaStep::AwardPoints,
            user_id,
            self.gamification
                .calculate_points(
                    user_id,
                    ActivityType::LessonCompletion,
                    LESSON_COMPLETION_BASE_POINTS,
                    &data,
                )
                .await,
            &mut failed,
        );
        let points_earned = award.as_ref().map(|a| a.calculation.total).unwrap_or(0);
        self.metrics.record_points(points_earned);

        // 4. Ledger
        if award.is_some() {
            let entry = PointsHistoryEntry {
                user_id,
                points_earned,
                points_type: ActivityType::LessonCompletion,
                source_id: Some(lesson_id.to_string()),
                earned_at: now,
            };
            self.best_effort(
                SagaStep::RecordHistory,
                user_id,
                self.storage.points_history.append(&entry).await.map_err(ServiceError::from),
                &mut failed,
            );
        }

        // 5. Daily stats
        let delta = DailyStatsDelta {
            lessons_completed: 1,
            study_time_minutes: study_minutes(time_spent),
            perfect_scores: u32::from(is_perfect_score),
            points_earned,
        };
        self.best_effort(
            SagaStep::RecordDailyStats,
            user_id,
            self.storage
                .daily_stats
                .increment(user_id, today, &delta)
                .await
                .map_err(ServiceError::from),
            &mut failed,
        );

        // 6. Achievements
        let late_unlocks = self
            .best_effort(
                SagaStep::CheckAchievements,
                user_id,
                self.gamification.check_and_unlock(user_id, &data).await,
                &mut failed,
            )
            .unwrap_or_default();

        // 7. Streak
        let streak_updated = self
            .best_effort(
                SagaStep::UpdateStreak,
                user_id,
                self.gamification.update_streak(user_id, now).await,
                &mut failed,
            )
            .map(|d| d.streak_updated())
            .unwrap_or(false);

        let (mut achievements_unlocked, milestones_reached) = award
            .map(|a| (a.achievements_unlocked, a.milestones_reached))
            .unwrap_or_default();
        for achievement in late_unlocks {
            if !achievements_unlocked.iter().any(|a| a.id == achievement.id) {
                achievements_unlocked.push(achievement);
            }
        }

        Ok(LessonCompletion {
            completed: true,
            result: ActivityResult {
                points_earned,
                achievements_unlocked,
                milestones_reached,
                streak_updated,
                feedback: points::feedback_message(score).to_string(),
            },
            failed_steps: failed,
        })
    }

    async fn load_context(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        today: NaiveDate,
    ) -> ServiceResult<CompletionContext> {
        let (lesson, today, finished_lessons) = tokio::try_join!(
            self.storage.lessons.get(lesson_id),
            self.storage.daily_stats.get(user_id, today),
            self.storage.progress.count_completed(user_id),
        )?;
        Ok(CompletionContext {
            lesson,
            today,
            finished_lessons,
        })
    }

    fn best_effort<T>(
        &self,
        step: SagaStep,
        user_id: UserId,
        outcome: ServiceResult<T>,
        failed: &mut Vec<SagaStep>,
    ) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(user_id, step = step.as_str(), error = %e, "Lesson completion step failed");
                self.metrics.record_step_failure();
                failed.push(step);
                None
            }
        }
    }
}

/// Seconds to whole minutes, rounded to nearest
fn study_minutes(time_spent: u32) -> u32 {
    time_spent.saturating_add(30) / 60
}

/// The progress row after a completion. Opening a lesson counts as the first
/// attempt; each completion of an already finished lesson counts another
fn completed_progress(
    existing: Option<UserProgress>,
    user_id: UserId,
    lesson_id: LessonId,
    score: u8,
    time_spent: u32,
    now: DateTime<Utc>,
) -> UserProgress {
    let mut progress = match existing {
        Some(mut p) => {
            if matches!(p.status, LessonStatus::Completed | LessonStatus::Mastered) {
                p.attempts += 1;
            }
            p.attempts = p.attempts.max(1);
            p
        }
        None => {
            let mut p = UserProgress::started(user_id, lesson_id, now);
            p.attempts = 1;
            p
        }
    };
    progress.status = LessonStatus::Completed;
    progress.score = score;
    progress.time_spent = time_spent;
    progress.completed_at = Some(now);
    progress.updated_at = now;
    progress
}
