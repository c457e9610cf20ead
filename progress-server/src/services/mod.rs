//! Application services
//!
//! Each service owns a clone of the [`StorageManager`] and a [`Clock`]:
//! - [`GamificationService`]: points, streaks, achievements, milestones, challenges
//! - [`ProgressService`]: lesson progress rows and analytics
//! - [`LessonService`]: the lesson completion saga

pub mod gamification;
pub mod lesson;
pub mod progress;

use std::sync::Arc;

pub use self::gamification::GamificationService;
pub use self::lesson::{LessonCompletion, LessonService, SagaStep};
pub use self::progress::ProgressService;

use crate::clock::Clock;
use crate::metrics::ServerMetrics;
use crate::storage::StorageManager;

/// All services wired to one store
#[derive(Clone)]
pub struct Services {
    pub gamification: Arc<GamificationService>,
    pub progress: Arc<ProgressService>,
    pub lessons: Arc<LessonService>,
}

impl Services {
    pub fn new(storage: StorageManager, metrics: Arc<ServerMetrics>, clock: Arc<dyn Clock>) -> Self {
        let gamification = Arc::new(GamificationService::new(storage.clone(), clock.clone()));
        let progress = Arc::new(ProgressService::new(
            storage.clone(),
            gamification.clone(),
            clock.clone(),
        ));
        let lessons = Arc::new(LessonService::new(storage, gamification.clone(), metrics, clock));
        Self {
            gamification,
            progress,
            lessons,
        }
    }
}
