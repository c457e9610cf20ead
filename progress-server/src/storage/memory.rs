//! In-memory store implementing every repository trait.
//!
//! Used by tests and offline runs. Mirrors the PostgreSQL schema's key and
//! check constraints so services behave the same against either backend.
//! Individual repositories can be switched into a failing state with
//! [`MemoryStore::fail`] to exercise best-effort paths.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use progress_core::{
    Achievement, DailyChallenge, DailyStats, DailyStatsDelta, GamificationStats, ItemProgress,
    Lesson, LessonId, MilestoneReward, PointsHistoryEntry, Profile, StreakShield,
    UserAchievement, UserChallengeCompletion, UserId, UserMilestoneCompletion, UserProgress,
};

use super::repository::*;

/// Repository that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Profiles,
    Lessons,
    Progress,
    Stats,
    Shields,
    Achievements,
    Milestones,
    Challenges,
    PointsHistory,
    DailyStats,
    Items,
}

#[derive(Default)]
struct Tables {
    profiles: BTreeMap<UserId, Profile>,
    lessons: BTreeMap<LessonId, Lesson>,
    progress: BTreeMap<(UserId, LessonId), UserProgress>,
    stats: BTreeMap<UserId, GamificationStats>,
    shields: Vec<StreakShield>,
    achievements: BTreeMap<i64, Achievement>,
    user_achievements: BTreeMap<(UserId, i64), UserAchievement>,
    milestones: BTreeMap<i64, MilestoneReward>,
    milestone_completions: BTreeMap<(UserId, i64), UserMilestoneCompletion>,
    challenges: BTreeMap<i64, DailyChallenge>,
    challenge_completions: BTreeMap<(UserId, i64), UserChallengeCompletion>,
    points_history: Vec<PointsHistoryEntry>,
    daily_stats: BTreeMap<(UserId, NaiveDate), DailyStats>,
    vocabulary: BTreeMap<(UserId, i64), ItemProgress>,
    grammar: BTreeMap<(UserId, i64), ItemProgress>,
}

impl Tables {
    fn items(&self, kind: ItemKind) -> &BTreeMap<(UserId, i64), ItemProgress> {
        match kind {
            ItemKind::Vocabulary => &self.vocabulary,
            ItemKind::Grammar => &self.grammar,
        }
    }

    fn items_mut(&mut self, kind: ItemKind) -> &mut BTreeMap<(UserId, i64), ItemProgress> {
        match kind {
            ItemKind::Vocabulary => &mut self.vocabulary,
            ItemKind::Grammar => &mut self.grammar,
        }
    }

    fn require_profile(&self, user_id: UserId) -> RepoResult<()> {
        if self.profiles.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!(
                "profile {} does not exist",
                user_id
            )))
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call on one repository return `StoreError::Unavailable`
    pub fn fail(&self, point: FailPoint) {
        self.failing.lock().insert(point);
    }

    pub fn heal(&self, point: FailPoint) {
        self.failing.lock().remove(&point);
    }

    pub fn heal_all(&self) {
        self.failing.lock().clear();
    }

    fn check(&self, point: FailPoint) -> RepoResult<()> {
        if self.failing.lock().contains(&point) {
            Err(StoreError::Unavailable(format!("{:?} (injected)", point)))
        } else {
            Ok(())
        }
    }
}

impl StorageManager {
    /// Wire every repository to one in-memory store
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            profiles: store.clone(),
            lessons: store.clone(),
            progress: store.clone(),
            stats: store.clone(),
            shields: store.clone(),
            achievements: store.clone(),
            milestones: store.clone(),
            challenges: store.clone(),
            points_history: store.clone(),
            daily_stats: store.clone(),
            items: store,
        }
    }
}

// ============================================================================
// Users & Lessons
// ============================================================================

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Profile>> {
        self.check(FailPoint::Profiles)?;
        Ok(self.tables.read().profiles.get(&user_id).cloned())
    }

    async fn create(&self, profile: &Profile) -> RepoResult<()> {
        self.check(FailPoint::Profiles)?;
        let mut tables = self.tables.write();
        if tables.profiles.values().any(|p| p.username == profile.username) {
            return Err(StoreError::Constraint(format!(
                "username {} taken",
                profile.username
            )));
        }
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::Constraint(format!("profile {} exists", profile.id)));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn add_points(&self, user_id: UserId, points: u64) -> RepoResult<u64> {
        self.check(FailPoint::Profiles)?;
        let mut tables = self.tables.write();
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))?;
        profile.points += points;
        Ok(profile.points)
    }
}

#[async_trait]
impl LessonRepo for MemoryStore {
    async fn get(&self, lesson_id: LessonId) -> RepoResult<Option<Lesson>> {
        self.check(FailPoint::Lessons)?;
        Ok(self.tables.read().lessons.get(&lesson_id).cloned())
    }

    async fn get_all(&self) -> RepoResult<Vec<Lesson>> {
        self.check(FailPoint::Lessons)?;
        Ok(self.tables.read().lessons.values().cloned().collect())
    }

    async fn upsert(&self, lesson: &Lesson) -> RepoResult<()> {
        self.check(FailPoint::Lessons)?;
        self.tables.write().lessons.insert(lesson.id, lesson.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepo for MemoryStore {
    async fn get(&self, user_id: UserId, lesson_id: LessonId) -> RepoResult<Option<UserProgress>> {
        self.check(FailPoint::Progress)?;
        Ok(self
            .tables
            .read()
            .progress
            .get(&(user_id, lesson_id))
            .cloned())
    }

    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<UserProgress>> {
        self.check(FailPoint::Progress)?;
        let mut rows: Vec<UserProgress> = self
            .tables
            .read()
            .progress
            .range((user_id, LessonId::MIN)..=(user_id, LessonId::MAX))
            .map(|(_, p)| p.clone())
            .collect();
        rows.sort_by_key(|p| std::cmp::Reverse(p.completed_at));
        Ok(rows)
    }

    async fn upsert(&self, progress: &UserProgress) -> RepoResult<()> {
        self.check(FailPoint::Progress)?;
        if progress.score > 100 {
            return Err(StoreError::Constraint(format!(
                "score {} out of range",
                progress.score
            )));
        }
        let mut tables = self.tables.write();
        tables.require_profile(progress.user_id)?;
        tables
            .progress
            .insert((progress.user_id, progress.lesson_id), progress.clone());
        Ok(())
    }

    async fn count_completed(&self, user_id: UserId) -> RepoResult<u64> {
        self.check(FailPoint::Progress)?;
        Ok(self
            .tables
            .read()
            .progress
            .range((user_id, LessonId::MIN)..=(user_id, LessonId::MAX))
            .filter(|(_, p)| p.status.is_finished())
            .count() as u64)
    }
}

// ============================================================================
// Gamification
// ============================================================================

#[async_trait]
impl StatsRepo for MemoryStore {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<GamificationStats>> {
        self.check(FailPoint::Stats)?;
        Ok(self.tables.read().stats.get(&user_id).cloned())
    }

    async fn create_if_absent(&self, stats: &GamificationStats) -> RepoResult<GamificationStats> {
        self.check(FailPoint::Stats)?;
        let mut tables = self.tables.write();
        tables.require_profile(stats.user_id)?;
        Ok(tables
            .stats
            .entry(stats.user_id)
            .or_insert_with(|| GamificationStats::new(stats.user_id))
            .clone())
    }

    async fn update(&self, stats: &GamificationStats) -> RepoResult<()> {
        self.check(FailPoint::Stats)?;
        if stats.current_streak > stats.longest_streak {
            return Err(StoreError::Constraint("check_streak_bound".into()));
        }
        if stats.used_shields > stats.total_shields {
            return Err(StoreError::Constraint("check_shield_bound".into()));
        }
        let mut tables = self.tables.write();
        let row = tables
            .stats
            .get_mut(&stats.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("stats for user {}", stats.user_id)))?;
        *row = stats.clone();
        Ok(())
    }
}

#[async_trait]
impl ShieldRepo for MemoryStore {
    async fn grant(
        &self,
        user_id: UserId,
        earned_at: DateTime<Utc>,
        shield_type: &str,
    ) -> RepoResult<i64> {
        self.check(FailPoint::Shields)?;
        let mut tables = self.tables.write();
        let id = tables.shields.len() as i64 + 1;
        tables.shields.push(StreakShield {
            id,
            user_id,
            earned_at,
            used_at: None,
            is_used: false,
            shield_type: shield_type.to_string(),
        });
        Ok(id)
    }

    async fn oldest_unused(&self, user_id: UserId) -> RepoResult<Option<StreakShield>> {
        self.check(FailPoint::Shields)?;
        Ok(self
            .tables
            .read()
            .shields
            .iter()
            .filter(|s| s.user_id == user_id && !s.is_used)
            .min_by_key(|s| (s.earned_at, s.id))
            .cloned())
    }

    async fn mark_used(&self, shield_id: i64, used_at: DateTime<Utc>) -> RepoResult<()> {
        self.check(FailPoint::Shields)?;
        let mut tables = self.tables.write();
        let shield = tables
            .shields
            .iter_mut()
            .find(|s| s.id == shield_id && !s.is_used)
            .ok_or_else(|| StoreError::NotFound(format!("unused shield {}", shield_id)))?;
        shield.is_used = true;
        shield.used_at = Some(used_at);
        Ok(())
    }

    async fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<StreakShield>> {
        self.check(FailPoint::Shields)?;
        Ok(self
            .tables
            .read()
            .shields
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AchievementRepo for MemoryStore {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>> {
        self.check(FailPoint::Achievements)?;
        Ok(self.tables.read().achievements.values().cloned().collect())
    }

    async fn upsert_definition(&self, achievement: &Achievement) -> RepoResult<()> {
        self.check(FailPoint::Achievements)?;
        let mut tables = self.tables.write();
        if tables
            .achievements
            .values()
            .any(|a| a.code == achievement.code && a.id != achievement.id)
        {
            return Err(StoreError::Constraint(format!(
                "achievement code {} taken",
                achievement.code
            )));
        }
        tables
            .achievements
            .insert(achievement.id, achievement.clone());
        Ok(())
    }

    async fn earned(&self, user_id: UserId) -> RepoResult<Vec<UserAchievement>> {
        self.check(FailPoint::Achievements)?;
        Ok(self
            .tables
            .read()
            .user_achievements
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, ua)| ua.clone())
            .collect())
    }

    async fn insert_if_absent(&self, earned: &UserAchievement) -> RepoResult<bool> {
        self.check(FailPoint::Achievements)?;
        let mut tables = self.tables.write();
        let key = (earned.user_id, earned.achievement_id);
        if tables.user_achievements.contains_key(&key) {
            return Ok(false);
        }
        tables.user_achievements.insert(key, earned.clone());
        Ok(true)
    }

    async fn mark_claimed(&self, user_id: UserId, achievement_id: i64) -> RepoResult<bool> {
        self.check(FailPoint::Achievements)?;
        let mut tables = self.tables.write();
        let row = tables
            .user_achievements
            .get_mut(&(user_id, achievement_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "achievement {} for user {}",
                    achievement_id, user_id
                ))
            })?;
        let flipped = !row.is_claimed;
        row.is_claimed = true;
        Ok(flipped)
    }
}

#[async_trait]
impl MilestoneRepo for MemoryStore {
    async fn catalog(&self) -> RepoResult<Vec<MilestoneReward>> {
        self.check(FailPoint::Milestones)?;
        Ok(self.tables.read().milestones.values().cloned().collect())
    }

    async fn upsert_definition(&self, milestone: &MilestoneReward) -> RepoResult<()> {
        self.check(FailPoint::Milestones)?;
        self.tables
            .write()
            .milestones
            .insert(milestone.id, milestone.clone());
        Ok(())
    }

    async fn completed(&self, user_id: UserId) -> RepoResult<Vec<UserMilestoneCompletion>> {
        self.check(FailPoint::Milestones)?;
        Ok(self
            .tables
            .read()
            .milestone_completions
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn insert_if_absent(&self, completion: &UserMilestoneCompletion) -> RepoResult<bool> {
        self.check(FailPoint::Milestones)?;
        let mut tables = self.tables.write();
        let key = (completion.user_id, completion.milestone_id);
        if tables.milestone_completions.contains_key(&key) {
            return Ok(false);
        }
        tables.milestone_completions.insert(key, completion.clone());
        Ok(true)
    }

    async fn mark_reward_claimed(&self, user_id: UserId, milestone_id: i64) -> RepoResult<bool> {
        self.check(FailPoint::Milestones)?;
        let mut tables = self.tables.write();
        let row = tables
            .milestone_completions
            .get_mut(&(user_id, milestone_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!("milestone {} for user {}", milestone_id, user_id))
            })?;
        let flipped = !row.reward_claimed;
        row.reward_claimed = true;
        Ok(flipped)
    }
}

#[async_trait]
impl ChallengeRepo for MemoryStore {
    async fn get(&self, challenge_id: i64) -> RepoResult<Option<DailyChallenge>> {
        self.check(FailPoint::Challenges)?;
        Ok(self.tables.read().challenges.get(&challenge_id).cloned())
    }

    async fn for_date(&self, date: NaiveDate) -> RepoResult<Option<DailyChallenge>> {
        self.check(FailPoint::Challenges)?;
        Ok(self
            .tables
            .read()
            .challenges
            .values()
            .find(|c| c.challenge_date == date)
            .cloned())
    }

    async fn upsert(&self, challenge: &DailyChallenge) -> RepoResult<()> {
        self.check(FailPoint::Challenges)?;
        let mut tables = self.tables.write();
        if tables
            .challenges
            .values()
            .any(|c| c.challenge_date == challenge.challenge_date && c.id != challenge.id)
        {
            return Err(StoreError::Constraint(format!(
                "daily challenge date {} taken",
                challenge.challenge_date
            )));
        }
        tables.challenges.insert(challenge.id, challenge.clone());
        Ok(())
    }

    async fn completion(
        &self,
        user_id: UserId,
        challenge_id: i64,
    ) -> RepoResult<Option<UserChallengeCompletion>> {
        self.check(FailPoint::Challenges)?;
        Ok(self
            .tables
            .read()
            .challenge_completions
            .get(&(user_id, challenge_id))
            .cloned())
    }

    async fn insert_completion_if_absent(
        &self,
        completion: &UserChallengeCompletion,
    ) -> RepoResult<bool> {
        self.check(FailPoint::Challenges)?;
        let mut tables = self.tables.write();
        let key = (completion.user_id, completion.challenge_id);
        if tables.challenge_completions.contains_key(&key) {
            return Ok(false);
        }
        tables.challenge_completions.insert(key, completion.clone());
        Ok(true)
    }

    async fn remove_completion(&self, user_id: UserId, challenge_id: i64) -> RepoResult<()> {
        self.check(FailPoint::Challenges)?;
        self.tables
            .write()
            .challenge_completions
            .remove(&(user_id, challenge_id));
        Ok(())
    }
}

// ============================================================================
// Ledgers & Practice
// ============================================================================

#[async_trait]
impl PointsHistoryRepo for MemoryStore {
    async fn append(&self, entry: &PointsHistoryEntry) -> RepoResult<()> {
        self.check(FailPoint::PointsHistory)?;
        self.tables.write().points_history.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, user_id: UserId, limit: usize) -> RepoResult<Vec<PointsHistoryEntry>> {
        self.check(FailPoint::PointsHistory)?;
        let tables = self.tables.read();
        // Insertion order breaks ties between equal timestamps
        let mut rows: Vec<(usize, &PointsHistoryEntry)> = tables
            .points_history
            .iter()
            .enumerate()
            .filter(|(_, e)| e.user_id == user_id)
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.earned_at.cmp(&a.earned_at).then(ib.cmp(ia)));
        Ok(rows.into_iter().take(limit).map(|(_, e)| e.clone()).collect())
    }
}

#[async_trait]
impl DailyStatsRepo for MemoryStore {
    async fn increment(
        &self,
        user_id: UserId,
        date: NaiveDate,
        delta: &DailyStatsDelta,
    ) -> RepoResult<DailyStats> {
        self.check(FailPoint::DailyStats)?;
        let mut tables = self.tables.write();
        tables.require_profile(user_id)?;
        let row = tables
            .daily_stats
            .entry((user_id, date))
            .or_insert_with(|| DailyStats {
                user_id,
                date,
                lessons_completed: 0,
                study_time_minutes: 0,
                perfect_scores: 0,
                points_earned: 0,
            });
        row.lessons_completed += delta.lessons_completed;
        row.study_time_minutes += delta.study_time_minutes;
        row.perfect_scores += delta.perfect_scores;
        row.points_earned += delta.points_earned;
        Ok(row.clone())
    }

    async fn get(&self, user_id: UserId, date: NaiveDate) -> RepoResult<Option<DailyStats>> {
        self.check(FailPoint::DailyStats)?;
        Ok(self.tables.read().daily_stats.get(&(user_id, date)).cloned())
    }

    async fn since(&self, user_id: UserId, since: NaiveDate) -> RepoResult<Vec<DailyStats>> {
        self.check(FailPoint::DailyStats)?;
        Ok(self
            .tables
            .read()
            .daily_stats
            .range((user_id, since)..=(user_id, NaiveDate::MAX))
            .rev()
            .map(|(_, d)| d.clone())
            .collect())
    }
}

#[async_trait]
impl ItemProgressRepo for MemoryStore {
    async fn get_all_for_user(
        &self,
        kind: ItemKind,
        user_id: UserId,
    ) -> RepoResult<Vec<ItemProgress>> {
        self.check(FailPoint::Items)?;
        Ok(self
            .tables
            .read()
            .items(kind)
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn upsert(&self, kind: ItemKind, item: &ItemProgress) -> RepoResult<()> {
        self.check(FailPoint::Items)?;
        if item.mastery_level > 5 || item.difficulty_rating > 5 {
            return Err(StoreError::Constraint("item levels must be 0-5".into()));
        }
        self.tables
            .write()
            .items_mut(kind)
            .insert((item.user_id, item.item_id), item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile(id: UserId) -> Profile {
        Profile {
            id,
            username: format!("learner{}", id),
            points: 0,
            level: "beginner".into(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_fail_point_only_affects_one_repo() {
        let store = MemoryStore::new();
        ProfileRepo::create(&store, &profile(1)).await.unwrap();
        store.fail(FailPoint::DailyStats);

        let delta = DailyStatsDelta {
            lessons_completed: 1,
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert!(matches!(
            store.increment(1, today, &delta).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(ProfileRepo::get(&store, 1).await.unwrap().is_some());

        store.heal(FailPoint::DailyStats);
        let row = store.increment(1, today, &delta).await.unwrap();
        assert_eq!(row.lessons_completed, 1);
    }

    #[tokio::test]
    async fn test_daily_stats_increment_is_additive() {
        let store = MemoryStore::new();
        ProfileRepo::create(&store, &profile(1)).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let delta = DailyStatsDelta {
            lessons_completed: 1,
            study_time_minutes: 5,
            perfect_scores: 0,
            points_earned: 60,
        };
        store.increment(1, today, &delta).await.unwrap();
        let row = store.increment(1, today, &delta).await.unwrap();
        assert_eq!(row.lessons_completed, 2);
        assert_eq!(row.study_time_minutes, 10);
        assert_eq!(row.points_earned, 120);
    }

    #[tokio::test]
    async fn test_oldest_unused_shield_first() {
        let store = MemoryStore::new();
        let early = Utc.with_ymd_and_hms(2026, 1, 7, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap();
        store.grant(1, late, "streak_reward").await.unwrap();
        let first = store.grant(1, early, "streak_reward").await.unwrap();
        let oldest = store.oldest_unused(1).await.unwrap().unwrap();
        assert_eq!(oldest.id, first);

        store.mark_used(first, late).await.unwrap();
        assert!(store.mark_used(first, late).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_update_enforces_bounds() {
        let store = MemoryStore::new();
        ProfileRepo::create(&store, &profile(1)).await.unwrap();
        let mut stats = store
            .create_if_absent(&GamificationStats::new(1))
            .await
            .unwrap();
        stats.current_streak = 3;
        assert!(matches!(
            StatsRepo::update(&store, &stats).await,
            Err(StoreError::Constraint(_))
        ));
        stats.longest_streak = 3;
        StatsRepo::update(&store, &stats).await.unwrap();
    }
}
