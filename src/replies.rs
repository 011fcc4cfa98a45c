//! Outbound message texts
//!
//! Every user-facing string lives here. Internal error detail is never
//! exposed; failures surface as one of the two generic replies at the bottom.

use crate::timezone::Zone;
use crate::user::User;

pub fn welcome() -> &'static str {
    "Hello! I keep a blood-pressure diary and remind you to measure in the \
     morning and in the evening.\n\
     120/70 - record a measurement\n\
     /when - set up reminders\n\
     /stop - stop reminders\n\
     /where - set your time zone\n\
     /history - measurement history\n\
     /status - reminder status"
}

pub fn ask_city() -> &'static str {
    "To set your time zone, tell me where you live.\nSend a city name"
}

pub fn ask_city_for_reminders() -> &'static str {
    "To schedule reminders correctly, tell me where you live.\nSend a city name"
}

pub fn ask_city_for_history() -> &'static str {
    "To show your history in local time, tell me where you live.\nSend a city name"
}

pub fn ask_morning_time() -> &'static str {
    "When should I remind you in the morning?\nSend a time as HH:MM"
}

pub fn ask_evening_time() -> &'static str {
    "When should I remind you in the evening?\nSame format - HH:MM"
}

pub fn thanks() -> &'static str {
    "Thank you"
}

pub fn recorded() -> &'static str {
    "Thanks, recorded"
}

pub fn stopped() -> &'static str {
    "All reminders are stopped. Send /when to set them up again"
}

pub fn zone_confirmation(zone: &Zone) -> String {
    format!("Time zone - {}", zone)
}

/// Current reminder summary, or the stopped-text when either slot is empty.
pub fn reminder_summary(user: &User) -> String {
    let (morning, evening) = match (&user.reminder_morning, &user.reminder_evening) {
        (Some(m), Some(e)) => (m, e),
        _ => return stopped().to_string(),
    };

    let display = match &user.zone {
        Some(zone) => *zone,
        None => morning.zone,
    };

    format!(
        "Reminders are set\nMorning at {}\nEvening at {}\n{}",
        morning.local_time(&display),
        evening.local_time(&display),
        zone_confirmation(&display)
    )
}

/// Measurement list, most recent first, in the user's zone.
pub fn history(user: &User) -> String {
    if user.measurements.is_empty() {
        return "No measurements saved yet".to_string();
    }

    let zone = user
        .zone
        .unwrap_or(Zone(chrono_tz::Tz::UTC));

    let mut lines = format!("Your measurements (time zone {}):", zone);
    for m in user.measurements.iter().rev() {
        lines.push_str("\n - ");
        lines.push_str(&m.local_display(&zone));
    }
    lines
}

pub fn notify_morning() -> &'static str {
    "Good morning! Time to measure your blood pressure"
}

pub fn notify_evening() -> &'static str {
    "Good evening! Time to measure your blood pressure"
}

pub fn notify_forgot() -> &'static str {
    "Looks like you forgot to send a reading.\n\
     To record a measurement, send a message like \"120/70\""
}

pub fn shrug() -> &'static str {
    "Sorry, I didn't understand that"
}

/// Shown when the requested action is not valid in the current conversation
/// state.
pub fn wrong_state() -> &'static str {
    "That doesn't fit here. Check your message and try again"
}

/// Shown for any other recoverable failure.
pub fn something_wrong() -> &'static str {
    "Something went wrong, let's try that again"
}
