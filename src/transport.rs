//! Chat transport collaborator
//!
//! The core only knows "send text to identity X". Inbound delivery is the
//! transport's job: it feeds received messages into
//! `BotService::handle_message`.

use crate::error::Result;
use crate::user::ChatId;
use std::sync::Mutex;

pub trait ChatSender: Send + Sync {
    fn send(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Prints outbound messages to stdout. Used by the `run` console transport.
pub struct ConsoleSender;

impl ChatSender for ConsoleSender {
    fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        println!("[{}] {}", chat_id, text);
        Ok(())
    }
}

/// Collects outbound messages instead of sending them. Test support.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingSender {
    pub fn new() -> RecordingSender {
        RecordingSender::default()
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("sender lock poisoned").clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text)
            .collect()
    }
}

impl ChatSender for RecordingSender {
    fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("sender lock poisoned")
            .push((chat_id, text.to_string()));
        Ok(())
    }
}
