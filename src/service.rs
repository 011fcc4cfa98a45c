//! Per-chat serialized message handling
//!
//! Both the inbound path and the scheduler go through `BotService`, which
//! runs every load -> transit -> send -> persist sequence under a per-chat
//! lock. The collaborators (store, sender, resolver) are injected; the
//! service owns no global state beyond the lock map.

use crate::dispatcher::{Dispatcher, State};
use crate::error::Result;
use crate::locate::LocateZone;
use crate::replies;
use crate::router::{classify, Route};
use crate::store::UserStore;
use crate::transport::ChatSender;
use crate::user::{ChatId, User};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

pub struct BotService {
    store: Arc<dyn UserStore>,
    sender: Arc<dyn ChatSender>,
    resolver: Arc<dyn LocateZone>,
    locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl BotService {
    pub fn new(
        store: Arc<dyn UserStore>,
        sender: Arc<dyn ChatSender>,
        resolver: Arc<dyn LocateZone>,
    ) -> BotService {
        BotService {
            store,
            sender,
            resolver,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn chat_lock(&self, chat_id: ChatId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(chat_id).or_default().clone()
    }

    /// Run one transition for a chat: load (or create) the aggregate, run
    /// the dispatcher, send the replies, persist. Serialized per chat so an
    /// inbound message and a scheduler notification cannot interleave.
    pub fn handle(
        &self,
        chat_id: ChatId,
        target: State,
        input: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let lock = self.chat_lock(chat_id);
        let _guard = lock.lock().expect("chat lock poisoned");

        let mut user = self
            .store
            .load(chat_id)?
            .unwrap_or_else(|| User::new(chat_id));

        let replies =
            Dispatcher::new(&mut user, input, self.resolver.as_ref(), now).transit(target)?;

        for reply in &replies {
            self.sender.send(chat_id, reply)?;
        }

        // Persist only after a fully successful transition; on any earlier
        // failure the stored record (and conversation context) is unchanged.
        self.store.upsert(&user)?;
        Ok(())
    }

    /// `handle` with the recovery policy applied: failures are logged and
    /// reported to the user as one of the two generic replies, never as
    /// internal detail.
    pub fn dispatch(&self, chat_id: ChatId, target: State, input: Option<&str>, now: DateTime<Utc>) {
        if let Err(err) = self.handle(chat_id, target, input, now) {
            error!(chat_id, %target, error = %err, "transition failed");
            let reply = if err.is_illegal_transition() {
                replies::wrong_state()
            } else {
                replies::something_wrong()
            };
            if let Err(send_err) = self.sender.send(chat_id, reply) {
                error!(chat_id, error = %send_err, "failed to send error reply");
            }
        }
    }

    /// Entry point for the chat transport: classify the message and fire the
    /// matching trigger.
    pub fn handle_message(&self, chat_id: ChatId, text: &str) {
        let user = match self.store.load(chat_id) {
            Ok(user) => user,
            Err(err) => {
                error!(chat_id, error = %err, "failed to load user for classification");
                return;
            }
        };

        match classify(user.as_ref(), text) {
            Route::Transit(target) => {
                debug!(chat_id, %target, "routing message");
                self.dispatch(chat_id, target, Some(text), Utc::now());
            }
            Route::Shrug => {
                if let Err(err) = self.sender.send(chat_id, replies::shrug()) {
                    error!(chat_id, error = %err, "failed to send shrug reply");
                }
            }
        }
    }
}
