//! French Learning Progress - Core Rules Library
//!
//! Deterministic gamification and progress logic, free of any I/O:
//! - Points calculation (streak multipliers, accuracy and activity bonuses)
//! - Daily streak state machine with streak shields
//! - Achievement rules and catalog
//! - Milestone thresholds and learner levels
//! - Section progress upserts and the lesson viewer flow
//! - Progress analytics aggregation
//!
//! Storage and transport live in `progress-server`.

pub mod achievements;
pub mod analytics;
pub mod constants;
pub mod error;
pub mod lesson_flow;
pub mod logging;
pub mod milestones;
pub mod model;
pub mod points;
pub mod sections;
pub mod streak;

pub use error::{CoreError, ParseError};
pub use model::*;
