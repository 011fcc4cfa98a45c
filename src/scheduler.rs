//! Reminder scheduler worker loop
//!
//! Once per wall-clock minute, scans every stored user and fires due
//! morning/evening/forgot notifications through the dispatcher. The three
//! checks are independent per user, each persisting its own transition, and
//! a failure for one user never aborts the tick for the rest.

use crate::dispatcher::State;
use crate::service::BotService;
use crate::store::UserStore;
use crate::user::User;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

pub struct Scheduler {
    service: Arc<BotService>,
    store: Arc<dyn UserStore>,
}

impl Scheduler {
    pub fn new(service: Arc<BotService>, store: Arc<dyn UserStore>) -> Scheduler {
        Scheduler { service, store }
    }

    /// Run forever on the current thread, aligned to minute boundaries.
    pub fn run(&self) {
        loop {
            self.tick(Utc::now());

            // Sleep to the next minute boundary regardless of how long the
            // tick took.
            let secs = 60 - (Utc::now().timestamp().rem_euclid(60)) as u64;
            thread::sleep(Duration::from_secs(secs));
        }
    }

    /// Spawn the loop on a dedicated thread.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn scheduler thread")
    }

    /// One scan over all stored users.
    pub fn tick(&self, now: DateTime<Utc>) {
        info!("starting scheduler tick");

        let users = match self.store.all() {
            Ok(users) => users,
            Err(err) => {
                error!(error = %err, "failed to load users for tick");
                return;
            }
        };

        for user in users {
            self.check_user(&user, now);
        }
    }

    /// Evaluate the three due conditions independently. Each dispatch
    /// reloads and persists the aggregate on its own, so a failure of one
    /// condition does not block the others.
    fn check_user(&self, user: &User, now: DateTime<Utc>) {
        let chat_id = user.chat_id;
        let mut notified = false;

        if user
            .reminder_morning
            .as_ref()
            .is_some_and(|r| r.is_due(now))
        {
            info!(chat_id, "morning reminder due");
            self.service.dispatch(chat_id, State::NotifyMorning, None, now);
            notified = true;
        }

        if user
            .reminder_evening
            .as_ref()
            .is_some_and(|r| r.is_due(now))
        {
            info!(chat_id, "evening reminder due");
            self.service.dispatch(chat_id, State::NotifyEvening, None, now);
            notified = true;
        }

        // A notification above re-arms the tracker, making the tick-start
        // snapshot stale for this check; consult the stored record instead.
        let forgot_due = if notified {
            match self.store.load(chat_id) {
                Ok(Some(fresh)) => fresh.forgot.is_due(now),
                Ok(None) => false,
                Err(err) => {
                    error!(chat_id, error = %err, "failed to reload user for forgot check");
                    false
                }
            }
        } else {
            user.forgot.is_due(now)
        };

        if forgot_due {
            info!(chat_id, "forgot escalation due");
            self.service.dispatch(chat_id, State::NotifyForgot, None, now);
        }
    }
}
