//! Seed Data - Catalog content for a fresh store
//!
//! Upserts the achievement and milestone catalogs plus a starter set of
//! lessons. Every write is an upsert keyed by id, so seeding on each
//! start is safe.

use chrono::{Datelike, NaiveDate};
use serde_json::json;
use tracing::info;

use progress_core::{achievements, milestones, DailyChallenge, Difficulty, Lesson, LessonType};

use super::repository::{RepoResult, StorageManager};

/// Seed all catalogs
pub async fn seed_all(storage: &StorageManager) -> RepoResult<usize> {
    let mut total = 0;
    total += seed_achievements(storage).await?;
    total += seed_milestones(storage).await?;
    total += seed_lessons(storage).await?;

    info!("Seeded {} catalog rows", total);
    Ok(total)
}

async fn seed_achievements(storage: &StorageManager) -> RepoResult<usize> {
    let catalog = achievements::default_catalog();
    for achievement in &catalog {
        storage.achievements.upsert_definition(achievement).await?;
    }
    Ok(catalog.len())
}

async fn seed_milestones(storage: &StorageManager) -> RepoResult<usize> {
    let catalog = milestones::default_catalog();
    for milestone in &catalog {
        storage.milestones.upsert_definition(milestone).await?;
    }
    Ok(catalog.len())
}

/// Starter lessons
pub fn starter_lessons() -> Vec<Lesson> {
    let lesson = |id, title: &str, lesson_type, difficulty| Lesson {
        id,
        title: title.into(),
        lesson_type,
        difficulty,
    };
    vec![
        // === Beginner ===
        lesson(1, "Bonjour ! Greetings", LessonType::Vocabulary, Difficulty::Beginner),
        lesson(2, "Les articles", LessonType::Grammar, Difficulty::Beginner),
        lesson(3, "Les voyelles nasales", LessonType::Pronunciation, Difficulty::Beginner),
        lesson(4, "Au café", LessonType::Conversation, Difficulty::Beginner),
        // === Intermediate ===
        lesson(10, "Le passé composé", LessonType::Grammar, Difficulty::Intermediate),
        lesson(11, "La cuisine régionale", LessonType::Cultural, Difficulty::Intermediate),
        lesson(12, "Un article de presse", LessonType::Reading, Difficulty::Intermediate),
        // === Advanced ===
        lesson(20, "Le subjonctif", LessonType::Grammar, Difficulty::Advanced),
        lesson(21, "Radio France", LessonType::Listening, Difficulty::Advanced),
    ]
}

async fn seed_lessons(storage: &StorageManager) -> RepoResult<usize> {
    let lessons = starter_lessons();
    for lesson in &lessons {
        storage.lessons.upsert(lesson).await?;
    }
    Ok(lessons.len())
}

/// Build the default challenge for a date; ids are derived from the date
pub fn challenge_for(date: NaiveDate) -> DailyChallenge {
    DailyChallenge {
        id: date.num_days_from_ce() as i64,
        challenge_date: date,
        title: "Défi du jour".into(),
        description: "Complete two lessons today.".into(),
        requirements: json!({ "lessons_completed": 2 }),
        reward_points: 100,
    }
}

/// Ensure a challenge exists for `date`
pub async fn seed_challenge(storage: &StorageManager, date: NaiveDate) -> RepoResult<DailyChallenge> {
    if let Some(existing) = storage.challenges.for_date(date).await? {
        return Ok(existing);
    }
    let challenge = challenge_for(date);
    storage.challenges.upsert(&challenge).await?;
    info!(date = %date, id = challenge.id, "Seeded daily challenge");
    Ok(challenge)
}
