//! Offline airport directory
//!
//! A resolver backed by a JSON extract of European airports with scheduled
//! service (OurAirports data), for running without Amadeus credentials. City
//! lookup is case-insensitive with an optional country filter; nearest
//! airport is a plain haversine scan.

use async_trait::async_trait;
use haversine::{Location, Units, distance};
use serde::Deserialize;
use std::path::Path;

use super::error::{ProviderError, Result};
use super::AirportResolver;
use crate::models::NearbyAirport;

/// One row of the bundled extract
#[derive(Debug, Clone, Deserialize)]
pub struct AirportRecord {
    pub name: String,
    #[serde(default)]
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub iata: String,
    #[serde(default)]
    pub icao: String,
    pub lat: f64,
    pub lon: f64,
}

pub struct AirportDirectory {
    airports: Vec<AirportRecord>,
}

impl AirportDirectory {
    /// Directory from the extract bundled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(include_str!("../../data/airports_europe.json"))
    }

    /// Directory from an external extract in the same format
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ProviderError::Api(format!(
                "Cannot read airport extract {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&raw)
    }

    fn from_json(raw: &str) -> Result<Self> {
        let airports: Vec<AirportRecord> = serde_json::from_str(raw)
            .map_err(|e| ProviderError::Parse(format!("Bad airport extract: {e}")))?;
        tracing::debug!(airports = airports.len(), "airport directory loaded");
        Ok(Self { airports })
    }

    /// All records with an IATA code serving the given city.
    ///
    /// The country filter only applies when it actually matches a record;
    /// the generator emits country names as often as ISO codes, so a filter
    /// that matches nothing falls back to a city-only lookup.
    fn lookup(&self, city: &str, country: Option<&str>) -> Option<&AirportRecord> {
        let by_city: Vec<&AirportRecord> = self
            .airports
            .iter()
            .filter(|a| !a.iata.is_empty() && a.city.eq_ignore_ascii_case(city.trim()))
            .collect();

        if let Some(country) = country {
            let filtered: Vec<&&AirportRecord> = by_city
                .iter()
                .filter(|a| a.country.eq_ignore_ascii_case(country.trim()))
                .collect();
            if let Some(found) = filtered.first() {
                return Some(found);
            }
        }

        by_city.first().copied()
    }
}

#[async_trait]
impl AirportResolver for AirportDirectory {
    async fn resolve_airport(&self, city: &str, country: Option<&str>) -> Result<Option<String>> {
        Ok(self.lookup(city, country).map(|a| a.iata.clone()))
    }

    async fn nearest_airport(&self, lat: f64, lon: f64) -> Result<Option<NearbyAirport>> {
        let here = Location {
            latitude: lat,
            longitude: lon,
        };

        Ok(self
            .airports
            .iter()
            .filter(|a| !a.iata.is_empty())
            .map(|a| {
                let km = distance(
                    Location {
                        latitude: here.latitude,
                        longitude: here.longitude,
                    },
                    Location {
                        latitude: a.lat,
                        longitude: a.lon,
                    },
                    Units::Kilometers,
                );
                (a, km)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(a, km)| NearbyAirport {
                iata: a.iata.clone(),
                name: a.name.clone(),
                distance_km: Some((km * 10.0).round() / 10.0),
            }))
    }
}
