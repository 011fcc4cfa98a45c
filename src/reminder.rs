//! Daily reminder and forgot-tracker temporal logic
//!
//! Due-ness is evaluated against a stored absolute instant rather than
//! recomputed from hour/minute each tick, so polling jitter or a DST shift
//! cannot skip or double-fire a reminder. The only mutation is an advance by
//! exactly one day, and only once the stored instant has passed.

use crate::error::{Error, Result};
use crate::timezone::Zone;
use chrono::{DateTime, Duration, DurationRound, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// How long after a fired reminder the forgot escalation becomes due.
pub const FORGOT_WINDOW: Duration = Duration::minutes(60);

/// A daily recurring reminder at `hour:minute` local to `zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub hour: u32,
    pub minute: u32,
    pub next_due: DateTime<Utc>,
    pub zone: Zone,
}

impl Reminder {
    /// Parse `"HH:MM"` (each field 1-2 digits, hour 0-24, minute 0-60) and
    /// compute the first due instant after `now`.
    pub fn create(text: &str, zone: Zone, now: DateTime<Utc>) -> Result<Reminder> {
        let (raw_hour, raw_minute) = text
            .split_once(':')
            .ok_or_else(|| Error::InvalidTimeFormat(text.to_string()))?;

        let hour = parse_field(raw_hour)?;
        let minute = parse_field(raw_minute)?;

        if hour > 24 || minute > 60 {
            return Err(Error::InvalidTimeFormat(text.to_string()));
        }

        Ok(Reminder {
            hour,
            minute,
            next_due: next_occurrence(hour, minute, &zone, now),
            zone,
        })
    }

    /// Whether the reminder should fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due <= now
    }

    /// Move `next_due` forward by exactly one day. Only legal once due;
    /// anything earlier is a programming error, never caused by user input.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_due(now) {
            return Err(Error::PrematureAdvance);
        }
        self.next_due += Duration::hours(24);
        Ok(())
    }

    /// The reminder's wall-clock time converted into a display zone,
    /// formatted `HH:MM`.
    pub fn local_time(&self, display: &Zone) -> String {
        let today = Utc::now().with_timezone(&self.zone.0).date_naive();
        let (hour, minute) = normalize(self.hour, self.minute);
        let local = today.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default());
        let shown = self
            .zone
            .instant_at(local)
            .with_timezone(&display.0);
        shown.format("%H:%M").to_string()
    }
}

impl std::fmt::Display for Reminder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

fn parse_field(raw: &str) -> Result<u32> {
    if raw.is_empty() || raw.len() > 2 {
        return Err(Error::InvalidTimeFormat(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| Error::InvalidTimeFormat(raw.to_string()))
}

/// Fold the accepted boundary values `24:xx` / `xx:60` onto the equivalent
/// wall-clock time (`24:60` is `01:00`).
fn normalize(hour: u32, minute: u32) -> (u32, u32) {
    let mut hour = hour;
    let mut minute = minute;
    if minute == 60 {
        hour += 1;
        minute = 0;
    }
    (hour % 24, minute)
}

/// Earliest occurrence of `hour:minute` in `zone` strictly after `now`:
/// today, or tomorrow if today's slot has already passed.
fn next_occurrence(hour: u32, minute: u32, zone: &Zone, now: DateTime<Utc>) -> DateTime<Utc> {
    let (hour, minute) = normalize(hour, minute);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();

    let local_now = now.with_timezone(&zone.0);
    let day = local_now.date_naive();

    let candidate = zone.instant_at(day.and_time(time));
    if candidate > now {
        candidate
    } else {
        let tomorrow = day.succ_opt().unwrap_or(day);
        zone.instant_at(tomorrow.and_time(time))
    }
}

/// Tracks whether a fired reminder was followed by a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgotTracker {
    pub last_notified: Option<DateTime<Utc>>,
}

impl ForgotTracker {
    pub fn new() -> ForgotTracker {
        ForgotTracker::default()
    }

    /// Due once a full window has passed since the last (minute-truncated)
    /// notification. Never due before any reminder has fired.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_notified {
            None => false,
            Some(at) => {
                let truncated = at.duration_trunc(Duration::minutes(1)).unwrap_or(at);
                truncated + FORGOT_WINDOW <= now
            }
        }
    }

    /// Called whenever a morning/evening reminder fires.
    pub fn update(&mut self, now: DateTime<Utc>) {
        self.last_notified = Some(now);
    }

    /// Called on a successful measurement record, or after firing once.
    pub fn reset(&mut self) {
        self.last_notified = None;
    }
}
