//! IANA time zone value
//!
//! A `Zone` is only ever produced by the location-resolution collaborator
//! (or built directly in tests); the core never derives one from coordinates.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone as _, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// An IANA time zone with UTC-offset formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone(pub Tz);

impl Zone {
    /// Parse an IANA zone identifier, e.g. `Europe/Moscow`.
    pub fn from_name(name: &str) -> Result<Zone> {
        name.parse::<Tz>()
            .map(Zone)
            .map_err(|_| Error::InvalidLocation(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Resolve a local wall-clock time in this zone to a UTC instant.
    ///
    /// Ambiguous times (DST fall-back) take the earlier occurrence; times in
    /// a DST gap are shifted forward by an hour.
    pub fn instant_at(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.0.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
            LocalResult::None => {
                let shifted = local + Duration::hours(1);
                match self.0.from_local_datetime(&shifted) {
                    LocalResult::Single(dt) => dt.with_timezone(&Utc),
                    LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
                    // A one-hour shift always lands outside the gap.
                    LocalResult::None => Utc.from_utc_datetime(&shifted),
                }
            }
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let offset = Utc::now().with_timezone(&self.0).format("%z");
        write!(f, "UTC {}", offset)
    }
}
