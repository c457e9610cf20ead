//! Streak Tracker state machine
//!
//! Decides, for one qualifying activity, how a user's daily streak moves:
//!
//! ```text
//! no previous activity            -> Started          (streak = 1)
//! same calendar date              -> SameDay          (nothing changes)
//! days_diff == 1, or 0 across
//!   a date boundary               -> Continued        (streak + 1, shield every 7th day)
//! days_diff > 1, shield available -> ShieldProtected  (streak kept, oldest shield used)
//! days_diff > 1, no shield        -> Reset            (streak = 1)
//! ```
//!
//! `days_diff` is the whole number of 24h periods between the last
//! activity timestamp and the new one. The decision is pure; the server
//! persists it as a single stats row update plus shield row writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SHIELD_INTERVAL_DAYS;
use crate::model::GamificationStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakTransition {
    Started,
    SameDay,
    Continued,
    ShieldProtected,
    Reset,
}

/// Outcome of evaluating one activity against the stored streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakDecision {
    pub transition: StreakTransition,
    pub new_streak: u32,
    pub longest_streak: u32,
    /// A new shield row must be granted
    pub shield_earned: bool,
    /// The oldest unused shield must be consumed
    pub shield_consumed: bool,
}

impl StreakDecision {
    /// False only for a repeat activity on the same calendar date
    pub fn streak_updated(&self) -> bool {
        self.transition != StreakTransition::SameDay
    }
}

/// Whole days between two instants, truncated
pub fn days_between(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last).num_days()
}

/// Evaluate one activity. `shield_available` reflects whether an unused
/// shield row exists for the user.
pub fn evaluate(
    stats: &GamificationStats,
    activity_at: DateTime<Utc>,
    shield_available: bool,
) -> StreakDecision {
    let current = stats.current_streak;

    let Some(last) = stats.last_activity_date else {
        return decision(StreakTransition::Started, 1, stats.longest_streak);
    };

    let days_diff = days_between(last, activity_at);
    let same_date = last.date_naive() == activity_at.date_naive();

    let transition = if days_diff < 0 || (days_diff == 0 && same_date) {
        StreakTransition::SameDay
    } else if days_diff <= 1 {
        StreakTransition::Continued
    } else if shield_available {
        StreakTransition::ShieldProtected
    } else {
        StreakTransition::Reset
    };

    let new_streak = match transition {
        StreakTransition::SameDay | StreakTransition::ShieldProtected => current,
        StreakTransition::Continued => current + 1,
        StreakTransition::Started | StreakTransition::Reset => 1,
    };

    decision(transition, new_streak, stats.longest_streak)
}

fn decision(transition: StreakTransition, new_streak: u32, longest: u32) -> StreakDecision {
    StreakDecision {
        transition,
        new_streak,
        longest_streak: longest.max(new_streak),
        shield_earned: transition == StreakTransition::Continued
            && new_streak > 0
            && new_streak % SHIELD_INTERVAL_DAYS == 0,
        shield_consumed: transition == StreakTransition::ShieldProtected,
    }
}

/// Apply a decision to the stats row in place
pub fn apply(stats: &mut GamificationStats, decision: &StreakDecision, activity_at: DateTime<Utc>) {
    if !decision.streak_updated() {
        return;
    }
    stats.current_streak = decision.new_streak;
    stats.longest_streak = decision.longest_streak.max(stats.longest_streak);
    if decision.shield_earned {
        stats.total_shields += 1;
    }
    if decision.shield_consumed {
        stats.used_shields = (stats.used_shields + 1).min(stats.total_shields);
    }
    stats.last_activity_date = Some(activity_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn stats_with(streak: u32, last: DateTime<Utc>) -> GamificationStats {
        GamificationStats {
            current_streak: streak,
            longest_streak: streak,
            last_activity_date: Some(last),
            ..GamificationStats::new(1)
        }
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let stats = GamificationStats::new(1);
        let d = evaluate(&stats, at(1, 9), false);
        assert_eq!(d.transition, StreakTransition::Started);
        assert_eq!(d.new_streak, 1);
        assert!(d.streak_updated());
    }

    #[test]
    fn test_next_day_continues() {
        let stats = stats_with(4, at(1, 9));
        let d = evaluate(&stats, at(2, 10), false);
        assert_eq!(d.transition, StreakTransition::Continued);
        assert_eq!(d.new_streak, 5);
    }

    #[test]
    fn test_same_day_repeat_is_noop() {
        let stats = stats_with(4, at(1, 9));
        let d = evaluate(&stats, at(1, 22), false);
        assert_eq!(d.transition, StreakTransition::SameDay);
        assert_eq!(d.new_streak, 4);
        assert!(!d.streak_updated());

        let mut applied = stats.clone();
        apply(&mut applied, &d, at(1, 22));
        assert_eq!(applied, stats);
    }

    #[test]
    fn test_under_24h_across_midnight_continues() {
        let stats = stats_with(2, at(1, 23));
        let d = evaluate(&stats, at(2, 7), false);
        assert_eq!(d.transition, StreakTransition::Continued);
        assert_eq!(d.new_streak, 3);
    }

    #[test]
    fn test_gap_without_shield_resets() {
        let stats = stats_with(12, at(1, 9));
        let d = evaluate(&stats, at(4, 9), false);
        assert_eq!(d.transition, StreakTransition::Reset);
        assert_eq!(d.new_streak, 1);
        assert_eq!(d.longest_streak, 12);
    }

    #[test]
    fn test_gap_with_shield_protects() {
        let stats = stats_with(12, at(1, 9));
        let d = evaluate(&stats, at(4, 9), true);
        assert_eq!(d.transition, StreakTransition::ShieldProtected);
        assert_eq!(d.new_streak, 12);
        assert!(d.shield_consumed);
        assert!(!d.shield_earned);
    }

    #[test]
    fn test_shield_granted_on_multiple_of_seven() {
        let stats = stats_with(6, at(1, 9));
        let d = evaluate(&stats, at(2, 9), false);
        assert_eq!(d.new_streak, 7);
        assert!(d.shield_earned);

        let stats = stats_with(13, at(1, 9));
        let d = evaluate(&stats, at(2, 9), false);
        assert_eq!(d.new_streak, 14);
        assert!(d.shield_earned);

        let stats = stats_with(7, at(1, 9));
        let d = evaluate(&stats, at(2, 9), false);
        assert!(!d.shield_earned);
    }

    #[test]
    fn test_backdated_activity_is_ignored() {
        let stats = stats_with(3, at(5, 9));
        let d = evaluate(&stats, at(5, 9) - Duration::days(2), false);
        assert_eq!(d.transition, StreakTransition::SameDay);
    }

    #[test]
    fn test_apply_updates_counters() {
        let mut stats = stats_with(6, at(1, 9));
        let d = evaluate(&stats, at(2, 9), false);
        apply(&mut stats, &d, at(2, 9));
        assert_eq!(stats.current_streak, 7);
        assert_eq!(stats.longest_streak, 7);
        assert_eq!(stats.total_shields, 1);
        assert_eq!(stats.last_activity_date, Some(at(2, 9)));

        let d = evaluate(&stats, at(9, 9), true);
        apply(&mut stats, &d, at(9, 9));
        assert_eq!(stats.current_streak, 7);
        assert_eq!(stats.used_shields, 1);
        assert!(stats.used_shields <= stats.total_shields);
    }
}
