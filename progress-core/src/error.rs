//! Error types shared by the core rule modules.

/// Failure to parse a stored string back into one of the core enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Errors raised by pure core operations (lesson flow, validation)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("score {0} is outside 0-100")]
    ScoreOutOfRange(u32),
    #[error("invalid lesson flow transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },
}
