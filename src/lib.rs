//! Pressure Diary - blood-pressure diary bot core
//!
//! Tracks per-user measurements through a chat conversation state machine
//! and reminds users to measure twice daily, with a "you forgot" escalation
//! an hour after an unanswered reminder. Chat transport, record store and
//! city-to-time-zone resolution are collaborators behind traits.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod locate;
pub mod measurement;
pub mod reminder;
pub mod replies;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod timezone;
pub mod transport;
pub mod user;

pub use error::{Error, Result};
