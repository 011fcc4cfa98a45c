//! Location resolution collaborator
//!
//! Resolves a free-text city name into an IANA time zone. The core never
//! computes a zone from coordinates itself; it only consumes a resolved
//! identifier or fails with `InvalidLocation`.

use crate::error::{Error, Result};
use crate::timezone::Zone;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub trait LocateZone: Send + Sync {
    fn resolve(&self, city: &str) -> Result<Zone>;
}

/// Geocoding lookup against the Open-Meteo API, which returns the IANA
/// time zone of the best-matching place.
pub struct OpenMeteoGeocoder {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    timezone: Option<String>,
}

impl OpenMeteoGeocoder {
    pub const DEFAULT_URL: &'static str = "https://geocoding-api.open-meteo.com";

    pub fn new(base_url: impl Into<String>) -> Result<OpenMeteoGeocoder> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(OpenMeteoGeocoder {
            client,
            base_url: base_url.into(),
        })
    }
}

impl LocateZone for OpenMeteoGeocoder {
    fn resolve(&self, city: &str) -> Result<Zone> {
        let url = format!("{}/v1/search", self.base_url);
        let response: GeocodingResponse = self
            .client
            .get(&url)
            .query(&[("name", city), ("count", "1")])
            .send()?
            .error_for_status()?
            .json()?;

        let hit = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidLocation(city.to_string()))?;

        tracing::info!(city, place = %hit.name, zone = ?hit.timezone, "geocoded");

        let name = hit
            .timezone
            .ok_or_else(|| Error::InvalidLocation(city.to_string()))?;
        Zone::from_name(&name)
    }
}

/// Static city-to-zone table. Test support and offline runs.
#[derive(Default)]
pub struct FixedZones {
    zones: HashMap<String, Zone>,
}

impl FixedZones {
    pub fn new() -> FixedZones {
        FixedZones::default()
    }

    pub fn single(city: &str, zone: Zone) -> FixedZones {
        let mut fixed = FixedZones::new();
        fixed.insert(city, zone);
        fixed
    }

    pub fn insert(&mut self, city: &str, zone: Zone) {
        self.zones.insert(city.to_lowercase(), zone);
    }
}

impl LocateZone for FixedZones {
    fn resolve(&self, city: &str) -> Result<Zone> {
        self.zones
            .get(&city.trim().to_lowercase())
            .copied()
            .ok_or_else(|| Error::InvalidLocation(city.to_string()))
    }
}
