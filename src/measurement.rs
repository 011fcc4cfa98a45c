//! Blood-pressure measurement parsing
//!
//! A reading arrives as `"H/L"` text, e.g. `"120/70"`. Both values must be
//! integers in `0..=1000`; no plausibility check beyond that.

use crate::error::{Error, Result};
use crate::timezone::Zone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) for either side of a reading.
pub const MAX_VALUE: i64 = 1000;

/// One recorded measurement. Immutable once created; history is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub high: u32,
    pub low: u32,
    pub taken_at: DateTime<Utc>,
}

impl Measurement {
    /// Parse `"H/L"` into a measurement captured at `taken_at`.
    pub fn parse(text: &str, taken_at: DateTime<Utc>) -> Result<Measurement> {
        let (high, low) = text
            .split_once('/')
            .ok_or_else(|| Error::MalformedReading(text.to_string()))?;

        Ok(Measurement {
            high: parse_value(high)?,
            low: parse_value(low)?,
            taken_at,
        })
    }

    /// Render as `H/L (YYYY-MM-DD HH:MM)` in the given display zone.
    pub fn local_display(&self, zone: &Zone) -> String {
        let local = self.taken_at.with_timezone(&zone.0);
        format!(
            "{}/{} ({})",
            self.high,
            self.low,
            local.format("%Y-%m-%d %H:%M")
        )
    }
}

fn parse_value(raw: &str) -> Result<u32> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::MalformedReading(raw.to_string()))?;

    if !(0..=MAX_VALUE).contains(&value) {
        return Err(Error::OutOfRange(value));
    }

    Ok(value as u32)
}
