//! Section progress bookkeeping inside a lesson's progress row.
//!
//! Invariant: at most one [`SectionProgress`] per `section_id`. Recording a
//! section again updates the existing record in place (upsert, not append).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{LessonStatus, SectionProgress, UserProgress};

/// One section attempt reported by the lesson viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAttempt {
    pub section_id: String,
    pub completed: bool,
    pub score: u8,
    pub time_spent: u32,
}

/// Upsert a section attempt into the progress row.
///
/// Attempts accumulate, time accumulates, the score keeps the best result
/// and `completed_at` is set the first time the section completes.
pub fn record_section(
    progress: &mut UserProgress,
    attempt: &SectionAttempt,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    if attempt.score > 100 {
        return Err(CoreError::ScoreOutOfRange(attempt.score as u32));
    }

    match progress
        .section_progress
        .iter_mut()
        .find(|s| s.section_id == attempt.section_id)
    {
        Some(existing) => {
            existing.attempts += 1;
            existing.time_spent += attempt.time_spent;
            existing.score = existing.score.max(attempt.score);
            if attempt.completed && !existing.completed {
                existing.completed = true;
                existing.completed_at = Some(now);
            }
        }
        None => progress.section_progress.push(SectionProgress {
            section_id: attempt.section_id.clone(),
            completed: attempt.completed,
            score: attempt.score,
            time_spent: attempt.time_spent,
            attempts: 1,
            completed_at: attempt.completed.then_some(now),
        }),
    }

    progress.time_spent += attempt.time_spent;
    if progress.status == LessonStatus::NotStarted {
        progress.status = LessonStatus::InProgress;
        progress.started_at.get_or_insert(now);
    }
    progress.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap()
    }

    fn attempt(id: &str, completed: bool, score: u8) -> SectionAttempt {
        SectionAttempt {
            section_id: id.into(),
            completed,
            score,
            time_spent: 30,
        }
    }

    #[test]
    fn test_repeat_section_updates_in_place() {
        let mut progress = UserProgress::started(1, 7, now());
        record_section(&mut progress, &attempt("intro", false, 40), now()).unwrap();
        record_section(&mut progress, &attempt("intro", true, 80), now()).unwrap();
        record_section(&mut progress, &attempt("intro", true, 60), now()).unwrap();

        assert_eq!(progress.section_progress.len(), 1);
        let s = &progress.section_progress[0];
        assert_eq!(s.attempts, 3);
        assert_eq!(s.score, 80);
        assert_eq!(s.time_spent, 90);
        assert!(s.completed);
        assert_eq!(progress.time_spent, 90);
    }

    #[test]
    fn test_distinct_sections_append() {
        let mut progress = UserProgress::started(1, 7, now());
        record_section(&mut progress, &attempt("intro", true, 100), now()).unwrap();
        record_section(&mut progress, &attempt("vocab", false, 50), now()).unwrap();
        assert_eq!(progress.section_progress.len(), 2);
        assert_eq!(progress.section_progress[1].section_id, "vocab");
    }

    #[test]
    fn test_rejects_score_above_100() {
        let mut progress = UserProgress::started(1, 7, now());
        let err = record_section(&mut progress, &attempt("intro", true, 101), now());
        assert_eq!(err, Err(CoreError::ScoreOutOfRange(101)));
        assert!(progress.section_progress.is_empty());
    }
}
