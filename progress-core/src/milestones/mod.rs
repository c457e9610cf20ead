//! Milestone Engine (pure evaluation)
//!
//! Milestones compare one user metric against a catalog threshold:
//! - `points`: cumulative profile points
//! - `streak`: current streak in days
//! - `level`: level rank 1-7 (see [`Level`])
//! - `achievements`: number of earned achievements

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::ParseError;
use crate::model::{MilestoneKind, MilestoneReward};

/// The seven learner levels, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Elementary,
    PreIntermediate,
    Intermediate,
    UpperIntermediate,
    Advanced,
    Proficient,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Beginner,
        Level::Elementary,
        Level::PreIntermediate,
        Level::Intermediate,
        Level::UpperIntermediate,
        Level::Advanced,
        Level::Proficient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Elementary => "elementary",
            Self::PreIntermediate => "pre_intermediate",
            Self::Intermediate => "intermediate",
            Self::UpperIntermediate => "upper_intermediate",
            Self::Advanced => "advanced",
            Self::Proficient => "proficient",
        }
    }

    /// 1 (beginner) through 7 (proficient)
    pub fn rank(&self) -> u64 {
        match self {
            Self::Beginner => 1,
            Self::Elementary => 2,
            Self::PreIntermediate => 3,
            Self::Intermediate => 4,
            Self::UpperIntermediate => 5,
            Self::Advanced => 6,
            Self::Proficient => 7,
        }
    }

    /// Rank of a stored level name; unknown names rank 0
    pub fn rank_of(name: &str) -> u64 {
        name.parse::<Level>().map(|l| l.rank()).unwrap_or(0)
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| ParseError::new("level", s))
    }
}

/// Snapshot of the metrics milestones are measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneMetrics {
    pub points: u64,
    pub current_streak: u32,
    pub level_rank: u64,
    pub achievement_count: u64,
}

impl MilestoneMetrics {
    pub fn value_for(&self, kind: MilestoneKind) -> u64 {
        match kind {
            MilestoneKind::Points => self.points,
            MilestoneKind::Streak => self.current_streak as u64,
            MilestoneKind::Level => self.level_rank,
            MilestoneKind::Achievements => self.achievement_count,
        }
    }
}

pub fn is_reached(milestone: &MilestoneReward, metrics: &MilestoneMetrics) -> bool {
    metrics.value_for(milestone.kind) >= milestone.threshold_value
}

/// Catalog entries not yet completed whose threshold is met
pub fn evaluate_reached<'a>(
    catalog: &'a [MilestoneReward],
    completed: &HashSet<i64>,
    metrics: &MilestoneMetrics,
) -> Vec<&'a MilestoneReward> {
    catalog
        .iter()
        .filter(|m| !completed.contains(&m.id))
        .filter(|m| is_reached(m, metrics))
        .collect()
}

fn milestone(
    id: i64,
    name: &str,
    description: &str,
    kind: MilestoneKind,
    threshold_value: u64,
    reward_points: u64,
) -> MilestoneReward {
    MilestoneReward {
        id,
        name: name.into(),
        description: description.into(),
        kind,
        threshold_value,
        reward_points,
    }
}

/// Built-in milestone catalog seeded into a fresh store
pub fn default_catalog() -> Vec<MilestoneReward> {
    use MilestoneKind as K;
    vec![
        milestone(1, "First Hundred", "Earn 100 points.", K::Points, 100, 10),
        milestone(2, "Thousand Club", "Earn 1,000 points.", K::Points, 1_000, 50),
        milestone(3, "Five Thousand", "Earn 5,000 points.", K::Points, 5_000, 150),
        milestone(10, "Week Warrior", "Reach a 7-day streak.", K::Streak, 7, 25),
        milestone(11, "Fortnight Focus", "Reach a 14-day streak.", K::Streak, 14, 50),
        milestone(12, "Monthly Master", "Reach a 30-day streak.", K::Streak, 30, 100),
        milestone(20, "Intermediate", "Reach the intermediate level.", K::Level, 4, 100),
        milestone(21, "Advanced", "Reach the advanced level.", K::Level, 6, 200),
        milestone(30, "Badge Collector", "Earn 5 achievements.", K::Achievements, 5, 50),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ranks_are_ordered() {
        let ranks: Vec<u64> = Level::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(Level::rank_of("upper_intermediate"), 5);
        assert_eq!(Level::rank_of("wizard"), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let m = milestone(1, "x", "", MilestoneKind::Streak, 7, 0);
        let mut metrics = MilestoneMetrics {
            current_streak: 6,
            ..Default::default()
        };
        assert!(!is_reached(&m, &metrics));
        metrics.current_streak = 7;
        assert!(is_reached(&m, &metrics));
    }

    #[test]
    fn test_evaluate_excludes_completed() {
        let catalog = default_catalog();
        let metrics = MilestoneMetrics {
            points: 1_200,
            current_streak: 8,
            level_rank: Level::Intermediate.rank(),
            achievement_count: 1,
        };
        let reached: Vec<i64> = evaluate_reached(&catalog, &HashSet::new(), &metrics)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(reached, vec![1, 2, 10, 20]);

        let completed: HashSet<i64> = [1, 2].into_iter().collect();
        let reached: Vec<i64> = evaluate_reached(&catalog, &completed, &metrics)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(reached, vec![10, 20]);
    }
}
