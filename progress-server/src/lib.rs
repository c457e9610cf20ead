//! Learning Progress Server Library
//!
//! Persistence and transport around the `progress-core` rule engines:
//! - Data Store Gateway (repository traits, PostgreSQL + in-memory backends)
//! - Gamification, progress and lesson completion services
//! - HTTP/JSON API with request metrics

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod services;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ServerConfig;
pub use error::{ServiceError, ServiceResult};
pub use services::Services;
pub use storage::{StorageManager, StoreError};
