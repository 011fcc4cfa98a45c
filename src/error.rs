//! Error types for pressure-diary

use crate::dispatcher::State;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transition to {target} is not allowed from {from}")]
    IllegalTransition { from: State, target: State },

    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("value out of range: {0}")]
    OutOfRange(i64),

    #[error("malformed reading: {0}")]
    MalformedReading(String),

    #[error("could not resolve location: {0}")]
    InvalidLocation(String),

    #[error("reminder advanced before its due time")]
    PrematureAdvance,

    #[error("no time zone configured for chat {0}")]
    MissingZone(i64),

    #[error("no {0} reminder configured for chat {1}")]
    MissingReminder(&'static str, i64),

    #[error("state {0} requires an inbound message")]
    MissingInput(State),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the user should see the "wrong state" reply rather than the
    /// generic one.
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Error::IllegalTransition { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
