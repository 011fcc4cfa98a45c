//! Inbound message classification
//!
//! Maps a raw chat message to a target state using command, regex and
//! current-state rules. The dispatcher re-validates everything; the router
//! only decides which trigger to fire.

use crate::dispatcher::State;
use crate::user::User;
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}:\d{1,2}$").unwrap());
// Up to four digits so the 1000 boundary routes through; the range check in
// measurement parsing rejects anything above it.
static READING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}/\d{1,4}$").unwrap());

/// Classification result: a state-machine trigger, or nothing recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Transit(State),
    Shrug,
}

/// Classify an inbound message for a (possibly not-yet-seen) user.
pub fn classify(user: Option<&User>, text: &str) -> Route {
    let text = text.trim();
    let state = user.map(|u| u.state);
    let has_zone = user.map(|u| u.zone.is_some()).unwrap_or(false);

    match text {
        "/start" => return Route::Transit(State::Start),
        "/stop" => return Route::Transit(State::Stop),
        "/where" => return Route::Transit(State::WaitForTz),
        "/status" => return Route::Transit(State::Status),
        "/history" => {
            return Route::Transit(if has_zone {
                State::History
            } else {
                State::WaitForTzHistory
            });
        }
        "/when" => {
            return Route::Transit(if has_zone {
                State::WaitForMorningTime
            } else {
                State::WaitForTzWhen
            });
        }
        _ => {}
    }

    match state {
        Some(State::WaitForMorningTime) if TIME_RE.is_match(text) => {
            Route::Transit(State::WaitForEveningTime)
        }
        Some(State::WaitForEveningTime) if TIME_RE.is_match(text) => Route::Transit(State::Wait),
        Some(State::Wait) if READING_RE.is_match(text) => Route::Transit(State::Record),
        // Any text in a city-prompt state is taken as a city name.
        Some(State::WaitForTz) => Route::Transit(State::Wait),
        Some(State::WaitForTzWhen) => Route::Transit(State::WaitForMorningTime),
        Some(State::WaitForTzHistory) => Route::Transit(State::History),
        _ => Route::Shrug,
    }
}
