//! Lesson progress and analytics.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use progress_core::analytics::{self, AnalyticsInput, ProgressAnalytics};
use progress_core::constants::{
    DAILY_STATS_LOOKBACK_DAYS, POINTS_HISTORY_LIMIT, QUESTION_COMPLETION_BASE_POINTS,
};
use progress_core::logging::TimingSpan;
use progress_core::sections::{self, SectionAttempt};
use progress_core::{
    ActivityData, ActivityType, DailyStatsDelta, LessonId, PointsHistoryEntry, UserId,
    UserProgress,
};

use super::gamification::GamificationService;
use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::repository::ItemKind;
use crate::storage::StorageManager;

/// One answered exercise inside a lesson section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseAnswer {
    pub section_id: String,
    pub correct: bool,
    /// 0-100
    pub score: u8,
    pub time_spent: u32,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseOutcome {
    pub progress: UserProgress,
    pub points_earned: u64,
}

pub struct ProgressService {
    storage: StorageManager,
    gamification: Arc<GamificationService>,
    clock: Arc<dyn Clock>,
}

impl ProgressService {
    pub fn new(
        storage: StorageManager,
        gamification: Arc<GamificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            gamification,
            clock,
        }
    }

    /// Fan out the reads, then aggregate
    pub async fn compute_analytics(&self, user_id: UserId) -> ServiceResult<ProgressAnalytics> {
        let today = self.clock.today();
        let since = today - Duration::days(DAILY_STATS_LOOKBACK_DAYS);

        let (progress, lessons, vocabulary, grammar, points_history, daily_stats) = tokio::try_join!(
            self.storage.progress.get_all_for_user(user_id),
            self.storage.lessons.get_all(),
            self.storage.items.get_all_for_user(ItemKind::Vocabulary, user_id),
            self.storage.items.get_all_for_user(ItemKind::Grammar, user_id),
            self.storage.points_history.recent(user_id, POINTS_HISTORY_LIMIT),
            self.storage.daily_stats.since(user_id, since),
        )?;

        let input = AnalyticsInput {
            today,
            progress,
            lessons: lessons.into_iter().map(|l| (l.id, l)).collect::<HashMap<_, _>>(),
            vocabulary,
            grammar,
            points_history,
            daily_stats,
        };
        debug!(
            user_id,
            progress_rows = input.progress.len(),
            daily_rows = input.daily_stats.len(),
            "Computing analytics"
        );
        let _timing = TimingSpan::new("compute_analytics");
        Ok(analytics::compute(&input))
    }

    /// Create the progress row on first access, otherwise return it unchanged
    pub async fn start_lesson(&self, user_id: UserId, lesson_id: LessonId) -> ServiceResult<UserProgress> {
        if self.storage.lessons.get(lesson_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("lesson {}", lesson_id)));
        }
        if let Some(existing) = self.storage.progress.get(user_id, lesson_id).await? {
            return Ok(existing);
        }

        let progress = UserProgress::started(user_id, lesson_id, self.clock.now());
        self.storage.progress.upsert(&progress).await?;
        info!(user_id, lesson_id, "Lesson started");
        Ok(progress)
    }

    pub async fn record_section_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        attempt: &SectionAttempt,
    ) -> ServiceResult<UserProgress> {
        let now = self.clock.now();
        let mut progress = match self.storage.progress.get(user_id, lesson_id).await? {
            Some(p) => p,
            None => UserProgress::started(user_id, lesson_id, now),
        };

        sections::record_section(&mut progress, attempt, now)?;
        self.storage.progress.upsert(&progress).await?;
        debug!(user_id, lesson_id, section = %attempt.section_id, "Section recorded");
        Ok(progress)
    }

    /// Record the section and award question points for a correct answer
    pub async fn complete_exercise(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        answer: &ExerciseAnswer,
    ) -> ServiceResult<ExerciseOutcome> {
        let attempt = SectionAttempt {
            section_id: answer.section_id.clone(),
            completed: answer.correct,
            score: answer.score,
            time_spent: answer.time_spent,
        };
        let progress = self
            .record_section_progress(user_id, lesson_id, &attempt)
            .await?;

        if !answer.correct {
            return Ok(ExerciseOutcome {
                progress,
                points_earned: 0,
            });
        }

        let data = ActivityData {
            accuracy: answer.accuracy,
            activity_type: Some(ActivityType::QuestionCompletion),
            lesson_id: Some(lesson_id),
            ..Default::default()
        };
        let award = self
            .gamification
            .calculate_points(
                user_id,
                ActivityType::QuestionCompletion,
                QUESTION_COMPLETION_BASE_POINTS,
                &data,
            )
            .await?;
        let points_earned = award.calculation.total;

        self.storage
            .points_history
            .append(&PointsHistoryEntry {
                user_id,
                points_earned,
                points_type: ActivityType::QuestionCompletion,
                source_id: Some(format!("{}:{}", lesson_id, answer.section_id)),
                earned_at: self.clock.now(),
            })
            .await?;
        self.storage
            .daily_stats
            .increment(
                user_id,
                self.clock.today(),
                &DailyStatsDelta {
                    points_earned,
                    ..Default::default()
                },
            )
            .await?;

        Ok(ExerciseOutcome {
            progress,
            points_earned,
        })
    }
}
