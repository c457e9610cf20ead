//! Database Migrations - PostgreSQL schema for learning progress
//!
//! Natural composite keys carry the idempotence guarantees:
//! user_achievements, user_milestone_completions and
//! user_challenge_completions are insert-if-absent on their primary key,
//! daily_stats is upsert-increment on (user_id, date).

/// SQL migration for creating all tables
pub const MIGRATION_V1: &str = r#"
-- ============================================================================
-- 1. Users & Lessons
-- ============================================================================

CREATE TABLE IF NOT EXISTS profiles (
    id              BIGSERIAL PRIMARY KEY,
    username        VARCHAR(50) UNIQUE NOT NULL,
    points          BIGINT NOT NULL DEFAULT 0 CHECK (points >= 0),
    level           VARCHAR(32) NOT NULL DEFAULT 'beginner',
    created_at      TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS lessons (
    id              BIGINT PRIMARY KEY,
    title           VARCHAR(200) NOT NULL,
    lesson_type     VARCHAR(32) NOT NULL,
    difficulty      VARCHAR(16) NOT NULL
);

CREATE TABLE IF NOT EXISTS user_progress (
    user_id          BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    lesson_id        BIGINT NOT NULL,
    status           VARCHAR(16) NOT NULL DEFAULT 'not_started',
    score            SMALLINT NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100),
    time_spent       INTEGER NOT NULL DEFAULT 0,
    attempts         INTEGER NOT NULL DEFAULT 0,
    section_progress JSONB NOT NULL DEFAULT '[]',
    started_at       TIMESTAMP WITH TIME ZONE,
    completed_at     TIMESTAMP WITH TIME ZONE,
    updated_at       TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, lesson_id)
);

CREATE INDEX IF NOT EXISTS idx_user_progress_user ON user_progress(user_id);

-- ============================================================================
-- 2. Streaks & Shields
-- ============================================================================

CREATE TABLE IF NOT EXISTS gamification_stats (
    user_id            BIGINT PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
    current_streak     INTEGER NOT NULL DEFAULT 0,
    longest_streak     INTEGER NOT NULL DEFAULT 0,
    total_shields      INTEGER NOT NULL DEFAULT 0,
    used_shields       INTEGER NOT NULL DEFAULT 0,
    weekly_points      BIGINT NOT NULL DEFAULT 0,
    monthly_points     BIGINT NOT NULL DEFAULT 0,
    week_start         DATE,
    month_start        DATE,
    last_activity_date TIMESTAMP WITH TIME ZONE,
    CONSTRAINT check_streak_bound CHECK (current_streak <= longest_streak),
    CONSTRAINT check_shield_bound CHECK (used_shields <= total_shields)
);

CREATE TABLE IF NOT EXISTS streak_shields (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    earned_at       TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    used_at         TIMESTAMP WITH TIME ZONE,
    is_used         BOOLEAN NOT NULL DEFAULT FALSE,
    shield_type     VARCHAR(32) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_streak_shields_unused ON streak_shields(user_id, earned_at) WHERE NOT is_used;

-- ============================================================================
-- 3. Achievements & Milestones
-- ============================================================================

CREATE TABLE IF NOT EXISTS achievements (
    id              BIGINT PRIMARY KEY,
    code            VARCHAR(64) UNIQUE NOT NULL,
    name            VARCHAR(100) NOT NULL,
    description     TEXT NOT NULL,
    category        VARCHAR(32) NOT NULL,
    tier            VARCHAR(16) NOT NULL,
    points_required BIGINT NOT NULL DEFAULT 0,
    badge_icon      VARCHAR(64) NOT NULL,
    badge_color     VARCHAR(16) NOT NULL,
    rule            JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS user_achievements (
    user_id         BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    achievement_id  BIGINT NOT NULL REFERENCES achievements(id),
    earned_at       TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    progress        SMALLINT NOT NULL DEFAULT 100,
    is_claimed      BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (user_id, achievement_id)
);

CREATE TABLE IF NOT EXISTS milestone_rewards (
    id              BIGINT PRIMARY KEY,
    name            VARCHAR(100) NOT NULL,
    description     TEXT NOT NULL,
    milestone_type  VARCHAR(16) NOT NULL,
    threshold_value BIGINT NOT NULL,
    reward_points   BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_milestone_completions (
    user_id         BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    milestone_id    BIGINT NOT NULL REFERENCES milestone_rewards(id),
    completed_at    TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    reward_claimed  BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (user_id, milestone_id)
);

-- ============================================================================
-- 4. Daily Challenges
-- ============================================================================

CREATE TABLE IF NOT EXISTS daily_challenges (
    id              BIGSERIAL PRIMARY KEY,
    challenge_date  DATE UNIQUE NOT NULL,
    title           VARCHAR(200) NOT NULL,
    description     TEXT NOT NULL,
    requirements    JSONB NOT NULL DEFAULT '{}',
    reward_points   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_challenge_completions (
    user_id          BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    challenge_id     BIGINT NOT NULL REFERENCES daily_challenges(id),
    points_earned    BIGINT NOT NULL DEFAULT 0,
    performance_data JSONB NOT NULL DEFAULT '{}',
    completed_at     TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, challenge_id)
);

-- ============================================================================
-- 5. Ledgers
-- ============================================================================

CREATE TABLE IF NOT EXISTS daily_stats (
    user_id            BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    date               DATE NOT NULL,
    lessons_completed  INTEGER NOT NULL DEFAULT 0,
    study_time_minutes INTEGER NOT NULL DEFAULT 0,
    perfect_scores     INTEGER NOT NULL DEFAULT 0,
    points_earned      BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, date)
);

CREATE TABLE IF NOT EXISTS points_history (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    points_earned   BIGINT NOT NULL,
    points_type     VARCHAR(32) NOT NULL,
    source_id       VARCHAR(64),
    earned_at       TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_points_history_user ON points_history(user_id, earned_at DESC);

-- ============================================================================
-- 6. Practice
-- ============================================================================

CREATE TABLE IF NOT EXISTS vocabulary_progress (
    user_id           BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    item_id           BIGINT NOT NULL,
    mastery_level     SMALLINT NOT NULL DEFAULT 0 CHECK (mastery_level BETWEEN 0 AND 5),
    difficulty_rating SMALLINT NOT NULL DEFAULT 0 CHECK (difficulty_rating BETWEEN 0 AND 5),
    times_practiced   INTEGER NOT NULL DEFAULT 0,
    last_practiced    TIMESTAMP WITH TIME ZONE,
    PRIMARY KEY (user_id, item_id)
);

CREATE TABLE IF NOT EXISTS grammar_progress (
    user_id           BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    item_id           BIGINT NOT NULL,
    mastery_level     SMALLINT NOT NULL DEFAULT 0 CHECK (mastery_level BETWEEN 0 AND 5),
    difficulty_rating SMALLINT NOT NULL DEFAULT 0 CHECK (difficulty_rating BETWEEN 0 AND 5),
    times_practiced   INTEGER NOT NULL DEFAULT 0,
    last_practiced    TIMESTAMP WITH TIME ZONE,
    PRIMARY KEY (user_id, item_id)
);
"#;

/// All migrations in order
pub fn get_migrations() -> Vec<(&'static str, &'static str)> {
    vec![("v1_initial_schema", MIGRATION_V1)]
}
