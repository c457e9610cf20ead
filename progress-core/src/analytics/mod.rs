//! Progress Analytics Aggregator
//!
//! Recomputes every derived learning statistic from raw rows:
//! - Totals (completed lessons, study time, mean score)
//! - Windowed points/lessons (today, last 7 days, last 30 days) from daily stats
//! - Mean score per difficulty band
//! - Per lesson type performance with an improvement trend
//! - Vocabulary and grammar mastery breakdowns
//! - Learning velocity and consistency score
//!
//! Pure function of its input; nothing is cached between calls.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::constants::*;
use crate::model::{
    DailyStats, Difficulty, ItemProgress, Lesson, LessonId, LessonType, PointsHistoryEntry,
    UserProgress,
};

/// Raw rows for one user
#[derive(Debug, Clone, Default)]
pub struct AnalyticsInput {
    pub today: NaiveDate,
    pub progress: Vec<UserProgress>,
    pub lessons: HashMap<LessonId, Lesson>,
    pub vocabulary: Vec<ItemProgress>,
    pub grammar: Vec<ItemProgress>,
    pub points_history: Vec<PointsHistoryEntry>,
    pub daily_stats: Vec<DailyStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub lesson_type: LessonType,
    pub attempted: u32,
    pub completed: u32,
    pub average_score: f64,
    /// Seconds
    pub average_time: f64,
    /// Percent
    pub completion_rate: f64,
    pub improvement_trend: ImprovementTrend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyScores {
    pub beginner: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MasteryBreakdown {
    pub total_items: u32,
    pub mastered: u32,
    pub mastery_percentage: f64,
    /// Mastery level 1-3
    pub learning: u32,
    pub difficult: u32,
    pub practiced_today: u32,
    pub practiced_this_week: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAnalytics {
    pub total_lessons_completed: u32,
    pub total_time_minutes: u32,
    pub average_score: f64,

    pub points_today: u64,
    pub points_this_week: u64,
    pub points_this_month: u64,
    pub lessons_today: u32,
    pub lessons_this_week: u32,
    pub lessons_this_month: u32,

    pub difficulty_scores: DifficultyScores,
    pub performance_by_type: BTreeMap<LessonType, PerformanceMetrics>,

    pub vocabulary: MasteryBreakdown,
    pub grammar: MasteryBreakdown,

    /// Mean lessons per day over the last week
    pub learning_velocity: f64,
    /// Percent of recent days with any activity
    pub consistency_score: f64,
    /// Ledger points keyed by activity type
    pub points_by_type: BTreeMap<String, u64>,
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Compare the newest window of scores with the one before it.
/// `scores` must be ordered newest first.
pub fn improvement_trend(scores: &[f64]) -> ImprovementTrend {
    let recent: Vec<f64> = scores.iter().take(TREND_WINDOW).copied().collect();
    let older: Vec<f64> = scores
        .iter()
        .skip(TREND_WINDOW)
        .take(TREND_WINDOW)
        .copied()
        .collect();

    if recent.len() < TREND_MIN_ENTRIES || older.len() < TREND_MIN_ENTRIES {
        return ImprovementTrend::Stable;
    }

    let delta = mean(recent) - mean(older);
    if delta > TREND_DELTA {
        ImprovementTrend::Improving
    } else if delta < -TREND_DELTA {
        ImprovementTrend::Declining
    } else {
        ImprovementTrend::Stable
    }
}

fn performance_for(
    lesson_type: LessonType,
    rows: &[&UserProgress],
) -> PerformanceMetrics {
    let attempted = rows.len() as u32;
    let mut completed: Vec<&UserProgress> = rows
        .iter()
        .copied()
        .filter(|p| p.status.is_finished())
        .collect();
    completed.sort_by_key(|p| Reverse(p.completed_at));

    let scores: Vec<f64> = completed.iter().map(|p| p.score as f64).collect();
    let completion_rate = if attempted == 0 {
        0.0
    } else {
        completed.len() as f64 / attempted as f64 * 100.0
    };

    PerformanceMetrics {
        lesson_type,
        attempted,
        completed: completed.len() as u32,
        average_score: mean(scores.iter().copied()),
        average_time: mean(completed.iter().map(|p| p.time_spent as f64)),
        completion_rate,
        improvement_trend: improvement_trend(&scores),
    }
}

/// Mastery breakdown for vocabulary words or grammar rules
pub fn mastery_breakdown(items: &[ItemProgress], today: NaiveDate) -> MasteryBreakdown {
    let week_start = today - Duration::days(WEEK_WINDOW_DAYS);
    let total = items.len() as u32;
    let mastered = items
        .iter()
        .filter(|i| i.mastery_level >= MASTERED_LEVEL)
        .count() as u32;
    let practiced_on = |pred: &dyn Fn(NaiveDate) -> bool| {
        items
            .iter()
            .filter_map(|i| i.last_practiced)
            .filter(|t| pred(t.date_naive()))
            .count() as u32
    };

    MasteryBreakdown {
        total_items: total,
        mastered,
        mastery_percentage: if total == 0 {
            0.0
        } else {
            mastered as f64 / total as f64 * 100.0
        },
        learning: items
            .iter()
            .filter(|i| (1..MASTERED_LEVEL).contains(&i.mastery_level))
            .count() as u32,
        difficult: items
            .iter()
            .filter(|i| i.difficulty_rating >= DIFFICULT_RATING)
            .count() as u32,
        practiced_today: practiced_on(&|d| d == today),
        practiced_this_week: practiced_on(&|d| d >= week_start),
    }
}

/// Mean lessons per day over the last `VELOCITY_WINDOW_DAYS` calendar days
pub fn learning_velocity(daily: &[DailyStats], today: NaiveDate) -> f64 {
    let cutoff = today - Duration::days(VELOCITY_WINDOW_DAYS);
    let lessons: u32 = daily
        .iter()
        .filter(|d| d.date > cutoff && d.date <= today)
        .map(|d| d.lessons_completed)
        .sum();
    lessons as f64 / VELOCITY_WINDOW_DAYS as f64
}

/// Percent of the most recent (up to 30) daily rows with any activity
pub fn consistency_score(daily: &[DailyStats]) -> f64 {
    let mut recent: Vec<&DailyStats> = daily.iter().collect();
    recent.sort_by_key(|d| Reverse(d.date));
    recent.truncate(CONSISTENCY_WINDOW_ROWS);
    if recent.is_empty() {
        return 0.0;
    }
    let active = recent.iter().filter(|d| d.has_activity()).count();
    active as f64 / recent.len() as f64 * 100.0
}

/// Aggregate all analytics for one user
pub fn compute(input: &AnalyticsInput) -> ProgressAnalytics {
    let today = input.today;
    let week_start = today - Duration::days(WEEK_WINDOW_DAYS);
    let month_start = today - Duration::days(MONTH_WINDOW_DAYS);

    // Totals
    let completed: Vec<&UserProgress> = input
        .progress
        .iter()
        .filter(|p| p.status.is_finished())
        .collect();
    let total_time_seconds: u64 = input.progress.iter().map(|p| p.time_spent as u64).sum();

    // Windows
    let window = |from: NaiveDate| {
        input
            .daily_stats
            .iter()
            .filter(|d| d.date >= from && d.date <= today)
            .fold((0u64, 0u32), |(pts, lessons), d| {
                (pts + d.points_earned, lessons + d.lessons_completed)
            })
    };
    let (points_today, lessons_today) = window(today);
    let (points_this_week, lessons_this_week) = window(week_start);
    let (points_this_month, lessons_this_month) = window(month_start);

    // Per difficulty
    let difficulty_of = |p: &UserProgress| input.lessons.get(&p.lesson_id).map(|l| l.difficulty);
    let difficulty_mean = |band: Difficulty| {
        mean(
            completed
                .iter()
                .filter(|p| difficulty_of(p) == Some(band))
                .map(|p| p.score as f64),
        )
    };

    // Per lesson type
    let mut by_type: HashMap<LessonType, Vec<&UserProgress>> = HashMap::new();
    for p in &input.progress {
        if let Some(lesson) = input.lessons.get(&p.lesson_id) {
            by_type.entry(lesson.lesson_type).or_default().push(p);
        }
    }
    let performance_by_type = LessonType::ALL
        .iter()
        .map(|&t| {
            let rows = by_type.get(&t).map(Vec::as_slice).unwrap_or(&[]);
            (t, performance_for(t, rows))
        })
        .collect();

    let mut points_by_type = BTreeMap::new();
    for entry in &input.points_history {
        *points_by_type
            .entry(entry.points_type.as_str().to_string())
            .or_insert(0) += entry.points_earned;
    }

    ProgressAnalytics {
        total_lessons_completed: completed.len() as u32,
        total_time_minutes: (total_time_seconds / 60) as u32,
        average_score: mean(completed.iter().map(|p| p.score as f64)),
        points_today,
        points_this_week,
        points_this_month,
        lessons_today,
        lessons_this_week,
        lessons_this_month,
        difficulty_scores: DifficultyScores {
            beginner: difficulty_mean(Difficulty::Beginner),
            intermediate: difficulty_mean(Difficulty::Intermediate),
            advanced: difficulty_mean(Difficulty::Advanced),
        },
        performance_by_type,
        vocabulary: mastery_breakdown(&input.vocabulary, today),
        grammar: mastery_breakdown(&input.grammar, today),
        learning_velocity: learning_velocity(&input.daily_stats, today),
        consistency_score: consistency_score(&input.daily_stats),
        points_by_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityType, LessonStatus};
    use chrono::{DateTime, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap()
    }

    fn lesson(id: LessonId, lesson_type: LessonType, difficulty: Difficulty) -> Lesson {
        Lesson {
            id,
            title: format!("Lesson {}", id),
            lesson_type,
            difficulty,
        }
    }

    fn done(lesson_id: LessonId, score: u8, day: u32) -> UserProgress {
        UserProgress {
            status: LessonStatus::Completed,
            score,
            time_spent: 600,
            completed_at: Some(ts(day)),
            ..UserProgress::started(1, lesson_id, ts(day))
        }
    }

    fn daily(date: NaiveDate, lessons: u32, points: u64) -> DailyStats {
        DailyStats {
            user_id: 1,
            date,
            lessons_completed: lessons,
            study_time_minutes: lessons * 10,
            perfect_scores: 0,
            points_earned: points,
        }
    }

    #[test]
    fn test_empty_input_is_all_zero_and_stable() {
        let analytics = compute(&AnalyticsInput {
            today: today(),
            ..Default::default()
        });
        assert_eq!(analytics.total_lessons_completed, 0);
        assert_eq!(analytics.average_score, 0.0);
        assert_eq!(analytics.consistency_score, 0.0);
        assert_eq!(analytics.performance_by_type.len(), LessonType::ALL.len());
        for metrics in analytics.performance_by_type.values() {
            assert_eq!(metrics.improvement_trend, ImprovementTrend::Stable);
            assert_eq!(metrics.completion_rate, 0.0);
        }
    }

    #[test]
    fn test_trend_windows() {
        // newest first
        let improving = [90.0, 92.0, 88.0, 95.0, 91.0, 70.0, 72.0, 68.0, 75.0, 71.0];
        assert_eq!(improvement_trend(&improving), ImprovementTrend::Improving);

        let declining: Vec<f64> = improving.iter().rev().copied().collect();
        assert_eq!(improvement_trend(&declining), ImprovementTrend::Declining);

        let flat = [80.0, 82.0, 79.0, 81.0, 80.0, 78.0, 80.0, 79.0];
        assert_eq!(improvement_trend(&flat), ImprovementTrend::Stable);

        // only two entries in the older window
        let short = [95.0, 95.0, 95.0, 95.0, 95.0, 10.0, 10.0];
        assert_eq!(improvement_trend(&short), ImprovementTrend::Stable);
    }

    #[test]
    fn test_totals_and_difficulty_means() {
        let lessons: HashMap<_, _> = [
            (1, lesson(1, LessonType::Vocabulary, Difficulty::Beginner)),
            (2, lesson(2, LessonType::Grammar, Difficulty::Intermediate)),
            (3, lesson(3, LessonType::Grammar, Difficulty::Intermediate)),
        ]
        .into_iter()
        .collect();
        let mut in_progress = UserProgress::started(1, 3, ts(14));
        in_progress.time_spent = 120;

        let analytics = compute(&AnalyticsInput {
            today: today(),
            progress: vec![done(1, 80, 10), done(2, 90, 12), in_progress],
            lessons,
            ..Default::default()
        });

        assert_eq!(analytics.total_lessons_completed, 2);
        assert_eq!(analytics.total_time_minutes, 22);
        assert!((analytics.average_score - 85.0).abs() < 1e-9);
        assert_eq!(analytics.difficulty_scores.beginner, 80.0);
        assert_eq!(analytics.difficulty_scores.intermediate, 90.0);
        assert_eq!(analytics.difficulty_scores.advanced, 0.0);

        let grammar = &analytics.performance_by_type[&LessonType::Grammar];
        assert_eq!(grammar.attempted, 2);
        assert_eq!(grammar.completed, 1);
        assert!((grammar.completion_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_windows_velocity_and_consistency() {
        let t = today();
        let rows = vec![
            daily(t, 2, 120),
            daily(t - Duration::days(1), 1, 50),
            daily(t - Duration::days(3), 0, 0),
            daily(t - Duration::days(7), 4, 200),
            daily(t - Duration::days(20), 3, 100),
        ];
        let analytics = compute(&AnalyticsInput {
            today: t,
            daily_stats: rows.clone(),
            ..Default::default()
        });

        assert_eq!(analytics.points_today, 120);
        assert_eq!(analytics.lessons_today, 2);
        assert_eq!(analytics.points_this_week, 370);
        assert_eq!(analytics.lessons_this_week, 7);
        assert_eq!(analytics.points_this_month, 470);
        assert_eq!(analytics.lessons_this_month, 10);

        // today-6 ..= today: 2 + 1 + 0
        assert!((learning_velocity(&rows, t) - 3.0 / 7.0).abs() < 1e-9);
        assert!((analytics.consistency_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_mastery_breakdown() {
        let t = today();
        let item = |level: u8, rating: u8, day: Option<u32>| ItemProgress {
            user_id: 1,
            item_id: 0,
            mastery_level: level,
            difficulty_rating: rating,
            times_practiced: 1,
            last_practiced: day.map(ts),
        };
        let items = vec![
            item(5, 1, Some(15)),
            item(4, 2, Some(12)),
            item(2, 4, Some(1)),
            item(0, 5, None),
        ];
        let b = mastery_breakdown(&items, t);
        assert_eq!(b.total_items, 4);
        assert_eq!(b.mastered, 2);
        assert!((b.mastery_percentage - 50.0).abs() < 1e-9);
        assert_eq!(b.learning, 1);
        assert_eq!(b.difficult, 2);
        assert_eq!(b.practiced_today, 1);
        assert_eq!(b.practiced_this_week, 2);
    }

    #[test]
    fn test_points_by_type_sums_ledger() {
        let entry = |points, kind| PointsHistoryEntry {
            user_id: 1,
            points_earned: points,
            points_type: kind,
            source_id: None,
            earned_at: ts(1),
        };
        let analytics = compute(&AnalyticsInput {
            today: today(),
            points_history: vec![
                entry(50, ActivityType::LessonCompletion),
                entry(70, ActivityType::LessonCompletion),
                entry(150, ActivityType::DailyChallenge),
            ],
            ..Default::default()
        });
        assert_eq!(analytics.points_by_type["lesson_completion"], 120);
        assert_eq!(analytics.points_by_type["daily_challenge"], 150);
    }
}
