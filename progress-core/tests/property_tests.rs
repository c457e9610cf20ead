//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL inputs:
//! - Points: multiplier is monotonic in the streak, totals never drop below base
//! - Streak: longest >= current, used shields <= total shields
//! - Achievements: evaluation never re-unlocks an earned id
//! - Analytics: percentages stay within 0-100

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

use progress_core::achievements::{self, RuleContext};
use progress_core::analytics::{self, AnalyticsInput};
use progress_core::points;
use progress_core::streak;
use progress_core::{ActivityData, ActivityType, DailyStats, GamificationStats};

fn activity_type() -> impl Strategy<Value = ActivityType> {
    prop::sample::select(ActivityType::ALL.to_vec())
}

fn activity_data() -> impl Strategy<Value = ActivityData> {
    (
        prop::option::of(0.0f64..=100.0),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop::option::of(0u32..50),
    )
        .prop_map(
            |(accuracy, is_perfect_score, five_in_a_row, first_attempt, has_streak, exchanges)| {
                ActivityData {
                    accuracy,
                    is_perfect_score,
                    five_in_a_row,
                    first_attempt,
                    has_streak,
                    exchange_count: exchanges,
                    ..Default::default()
                }
            },
        )
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()
}

// ============================================================
// Points Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_multiplier_is_monotonic(a in 0u32..400, b in 0u32..400) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(points::streak_multiplier(lo) <= points::streak_multiplier(hi));
    }

    #[test]
    fn prop_multiplier_bounded(streak in any::<u32>()) {
        let m = points::streak_multiplier(streak);
        prop_assert!((1.0..=2.0).contains(&m));
    }

    #[test]
    fn prop_total_at_least_base(
        kind in activity_type(),
        base in 0u32..500,
        data in activity_data(),
        streak in 0u32..100,
    ) {
        let calc = points::calculate(kind, base, &data, streak);
        prop_assert!(calc.total >= base as u64, "total {} < base {}", calc.total, base);
    }

    #[test]
    fn prop_longer_streak_never_pays_less(
        kind in activity_type(),
        base in 0u32..500,
        data in activity_data(),
        streak in 0u32..100,
    ) {
        let shorter = points::calculate(kind, base, &data, streak);
        let longer = points::calculate(kind, base, &data, streak + 1);
        prop_assert!(longer.total >= shorter.total);
    }
}

// ============================================================
// Streak Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_streak_invariants_hold_over_any_schedule(
        gaps in prop::collection::vec(0i64..96, 1..60),
        shield_flags in prop::collection::vec(any::<bool>(), 60),
    ) {
        let mut stats = GamificationStats::new(1);
        let mut now = base_time();

        for (i, gap_hours) in gaps.iter().enumerate() {
            now += Duration::hours(*gap_hours);
            let shield_available = shield_flags[i] && stats.available_shields() > 0;
            let decision = streak::evaluate(&stats, now, shield_available);
            streak::apply(&mut stats, &decision, now);

            prop_assert!(stats.current_streak >= 1);
            prop_assert!(stats.longest_streak >= stats.current_streak);
            prop_assert!(stats.used_shields <= stats.total_shields);
        }
    }

    #[test]
    fn prop_same_day_repeat_is_noop(streak_len in 1u32..60, minutes in 0i64..60) {
        let last = base_time();
        let stats = GamificationStats {
            current_streak: streak_len,
            longest_streak: streak_len,
            last_activity_date: Some(last),
            ..GamificationStats::new(1)
        };
        let decision = streak::evaluate(&stats, last + Duration::minutes(minutes), false);
        prop_assert!(!decision.streak_updated());
        prop_assert_eq!(decision.new_streak, streak_len);
    }
}

// ============================================================
// Achievement Properties
// ============================================================

proptest! {
    #[test]
    fn prop_earned_achievements_never_unlock_again(
        data in activity_data(),
        streak_len in 0u32..40,
        total_points in 0u64..20_000,
    ) {
        let catalog = achievements::default_catalog();
        let stats = GamificationStats { current_streak: streak_len, ..GamificationStats::new(1) };
        let ctx = RuleContext { activity: &data, stats: &stats, total_points };

        let first: HashSet<i64> = achievements::evaluate_unlocks(&catalog, &HashSet::new(), &ctx)
            .iter()
            .map(|a| a.id)
            .collect();
        let second = achievements::evaluate_unlocks(&catalog, &first, &ctx);
        prop_assert!(second.is_empty());
    }
}

// ============================================================
// Analytics Properties
// ============================================================

proptest! {
    #[test]
    fn prop_consistency_is_a_percentage(
        rows in prop::collection::vec((0u32..5, 0u64..300), 0..60),
    ) {
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let daily: Vec<DailyStats> = rows
            .iter()
            .enumerate()
            .map(|(i, (lessons, pts))| DailyStats {
                user_id: 1,
                date: today - Duration::days(i as i64),
                lessons_completed: *lessons,
                study_time_minutes: lessons * 10,
                perfect_scores: 0,
                points_earned: *pts,
            })
            .collect();

        let result = analytics::compute(&AnalyticsInput {
            today,
            daily_stats: daily,
            ..Default::default()
        });
        prop_assert!((0.0..=100.0).contains(&result.consistency_score));
        prop_assert!(result.points_today <= result.points_this_week);
        prop_assert!(result.points_this_week <= result.points_this_month);
        prop_assert!(result.learning_velocity >= 0.0);
    }
}
