//! Error taxonomy
//!
//! Only configuration and ingestion problems are errors. Stale callbacks and
//! input outside a running session are silent no-ops and never show up here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Tried to start a session without any words
    #[error("cannot start a session with an empty word pool")]
    EmptyPool,
    /// Uploaded list produced zero usable entries
    #[error("word list contains no usable lines")]
    EmptyWordList,
    /// Start requested while a session is running or paused
    #[error("a session is already in progress")]
    SessionActive,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::InvalidSettings(err.to_string())
    }
}
