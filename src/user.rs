//! The per-chat durable aggregate
//!
//! One record per chat identity, mutated only through dispatcher transitions
//! and persisted as JSON by the store. Never deleted: stopping reminders
//! clears the two reminder slots but keeps history and zone.

use crate::dispatcher::State;
use crate::measurement::Measurement;
use crate::reminder::{ForgotTracker, Reminder};
use crate::timezone::Zone;
use serde::{Deserialize, Serialize};

pub type ChatId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub chat_id: ChatId,
    pub state: State,
    pub reminder_morning: Option<Reminder>,
    pub reminder_evening: Option<Reminder>,
    #[serde(default)]
    pub forgot: ForgotTracker,
    pub measurements: Vec<Measurement>,
    pub zone: Option<Zone>,
}

impl User {
    /// A fresh aggregate for a chat identity seen for the first time.
    pub fn new(chat_id: ChatId) -> User {
        User {
            chat_id,
            state: State::Initial,
            reminder_morning: None,
            reminder_evening: None,
            forgot: ForgotTracker::new(),
            measurements: Vec::new(),
            zone: None,
        }
    }
}
