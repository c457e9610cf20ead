//! Lesson viewer state machine
//!
//! Which section of a lesson is on screen, independent of any UI toolkit.
//!
//! ```text
//! Loading --Loaded{n>0}--> Viewing(0) --Next--> Viewing(i+1) ... --Finish--> Completed
//!    |                        |  ^--Previous--'
//!    '--------Fail------------'-----> Error --Retry--> Loading
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonFlowState {
    Loading,
    Viewing { section_index: usize, section_count: usize },
    Completed,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonFlowEvent {
    Loaded { section_count: usize },
    Next,
    Previous,
    Finish,
    Fail { message: String },
    Retry,
}

impl fmt::Display for LessonFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Viewing {
                section_index,
                section_count,
            } => write!(f, "viewing {}/{}", section_index + 1, section_count),
            Self::Completed => write!(f, "completed"),
            Self::Error { message } => write!(f, "error ({})", message),
        }
    }
}

impl fmt::Display for LessonFlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { section_count } => write!(f, "loaded({})", section_count),
            Self::Next => write!(f, "next"),
            Self::Previous => write!(f, "previous"),
            Self::Finish => write!(f, "finish"),
            Self::Fail { .. } => write!(f, "fail"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

impl LessonFlowState {
    /// Apply one event, returning the next state or an invalid-transition error
    pub fn transition(&self, event: LessonFlowEvent) -> Result<LessonFlowState, CoreError> {
        use LessonFlowEvent as E;
        use LessonFlowState as S;

        let next = match (self, &event) {
            (_, E::Fail { message }) => S::Error {
                message: message.clone(),
            },
            (S::Loading, E::Loaded { section_count }) if *section_count > 0 => S::Viewing {
                section_index: 0,
                section_count: *section_count,
            },
            (
                S::Viewing {
                    section_index,
                    section_count,
                },
                E::Next,
            ) if section_index + 1 < *section_count => S::Viewing {
                section_index: section_index + 1,
                section_count: *section_count,
            },
            (
                S::Viewing {
                    section_index,
                    section_count,
                },
                E::Previous,
            ) if *section_index > 0 => S::Viewing {
                section_index: section_index - 1,
                section_count: *section_count,
            },
            (
                S::Viewing {
                    section_index,
                    section_count,
                },
                E::Finish,
            ) if section_index + 1 == *section_count => S::Completed,
            (S::Error { .. }, E::Retry) => S::Loading,
            _ => {
                return Err(CoreError::InvalidTransition {
                    state: self.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
