//! Shared fixtures: a seeded in-memory store, a pinned clock and one learner.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use progress_core::{GamificationStats, Profile, UserId};
use progress_server::metrics::ServerMetrics;
use progress_server::storage::memory::MemoryStore;
use progress_server::storage::{init_memory_storage, StorageManager};
use progress_server::{FixedClock, Services};

pub const USER: UserId = 1;

pub struct TestEnv {
    pub storage: StorageManager,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub metrics: Arc<ServerMetrics>,
    pub services: Services,
}

/// Monday 2026-03-02, 10:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

pub fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

pub async fn setup() -> TestEnv {
    let (storage, store) = init_memory_storage().await.unwrap();
    let clock = Arc::new(FixedClock::new(start_time()));
    let metrics = ServerMetrics::new();
    let services = Services::new(storage.clone(), metrics.clone(), clock.clone());

    storage
        .profiles
        .create(&Profile {
            id: USER,
            username: "amelie".into(),
            points: 0,
            level: "beginner".into(),
            created_at: Some(start_time()),
        })
        .await
        .unwrap();

    TestEnv {
        storage,
        store,
        clock,
        metrics,
        services,
    }
}

/// Overwrite the learner's streak state
pub async fn set_streak(
    env: &TestEnv,
    current: u32,
    last_activity: DateTime<Utc>,
    total_shields: u32,
) -> GamificationStats {
    let mut stats = env
        .storage
        .stats
        .create_if_absent(&GamificationStats::new(USER))
        .await
        .unwrap();
    stats.current_streak = current;
    stats.longest_streak = stats.longest_streak.max(current);
    stats.total_shields = total_shields;
    stats.last_activity_date = Some(last_activity);
    env.storage.stats.update(&stats).await.unwrap();
    stats
}

pub async fn stats(env: &TestEnv) -> GamificationStats {
    env.storage.stats.get(USER).await.unwrap().unwrap()
}

pub async fn profile_points(env: &TestEnv) -> u64 {
    env.storage.profiles.get(USER).await.unwrap().unwrap().points
}
