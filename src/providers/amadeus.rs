//! Amadeus test-API client: flight pricing and airport resolution
//!
//! One client serves both provider traits. Lookups are cached on disk
//! because the test API is heavily rate limited; the OAuth2
//! client-credentials token is cached in memory until shortly before it
//! expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::instrument;

use super::error::{ProviderError, Result};
use super::{AirportResolver, PricingService};
use crate::cache::{self, LookupKey};
use crate::config::AmadeusConfig;
use crate::models::{Fare, NearbyAirport};

/// Nearest-airport search radius in km, matching the API maximum we care about
const NEAREST_RADIUS_KM: u32 = 200;

pub struct AmadeusClient {
    client: ClientWithMiddleware,
    client_id: String,
    client_secret: String,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<FlightOffer>,
}

#[derive(Debug, Deserialize)]
struct FlightOffer {
    price: OfferPrice,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    total: String,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    data: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
    iata_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirportsResponse {
    #[serde(default)]
    data: Vec<AirportEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirportEntry {
    name: Option<String>,
    iata_code: Option<String>,
    distance: Option<DistanceEntry>,
}

#[derive(Debug, Deserialize)]
struct DistanceEntry {
    value: f64,
}

impl AmadeusClient {
    pub fn new(config: &AmadeusConfig) -> Result<Self> {
        let (Some(client_id), Some(client_secret)) =
            (config.client_id.clone(), config.client_secret.clone())
        else {
            return Err(ProviderError::Auth(
                "Amadeus client id and secret are required".to_string(),
            ));
        };

        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(concat!("tripsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            client_id,
            client_secret,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// OAuth2 client-credentials token, fetched once and reused until it is
    /// about to expire
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!("fetching new Amadeus access token");
        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(response, "Token request").await?;
        let token: TokenResponse = response.json().await?;

        // Renew a minute early so in-flight requests never race expiry
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in.saturating_sub(60));
        *guard = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    async fn fetch_cheapest_fare(
        &self,
        origin: &str,
        destination: &str,
        date: &str,
        passengers: u32,
    ) -> Result<Option<Fare>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .query(&[
                ("originLocationCode", origin.to_string()),
                ("destinationLocationCode", destination.to_string()),
                ("departureDate", date.to_string()),
                ("adults", passengers.to_string()),
                ("max", "5".to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_status(response, "Flight offers search").await?;
        let offers: OffersResponse = response.json().await?;

        Ok(cheapest_offer(&offers.data))
    }

    async fn fetch_airport(&self, city: &str, country: Option<&str>) -> Result<Option<String>> {
        let token = self.access_token().await?;

        let mut query = vec![
            ("subType", "AIRPORT".to_string()),
            ("keyword", city.to_string()),
            ("max", "1".to_string()),
        ];
        if let Some(country) = country {
            query.push(("countryCode", country.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/v1/reference-data/locations", self.base_url))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_status(response, "Airport search").await?;
        let locations: LocationsResponse = response.json().await?;

        Ok(locations.data.into_iter().next().and_then(|l| l.iata_code))
    }
}

#[async_trait]
impl PricingService for AmadeusClient {
    #[instrument(skip(self), level = "debug")]
    async fn cheapest_fare(
        &self,
        origin: &str,
        destination: &str,
        departure: NaiveDate,
        passengers: u32,
    ) -> Result<Option<Fare>> {
        let date = departure.format("%Y-%m-%d").to_string();
        let key = LookupKey::fare(origin, destination, departure, passengers);
        cache::fetch_or(&key, || {
            self.fetch_cheapest_fare(origin, destination, &date, passengers)
        })
        .await
    }
}

#[async_trait]
impl AirportResolver for AmadeusClient {
    #[instrument(skip(self), level = "debug")]
    async fn resolve_airport(&self, city: &str, country: Option<&str>) -> Result<Option<String>> {
        let key = LookupKey::airport(city, country);
        cache::fetch_or(&key, || self.fetch_airport(city, country)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn nearest_airport(&self, lat: f64, lon: f64) -> Result<Option<NearbyAirport>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!(
                "{}/v1/reference-data/locations/airports",
                self.base_url
            ))
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("radius", NEAREST_RADIUS_KM.to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_status(response, "Nearest airport search").await?;
        let airports: AirportsResponse = response.json().await?;

        Ok(airports.data.into_iter().find_map(|entry| {
            let iata = entry.iata_code?;
            Some(NearbyAirport {
                iata,
                name: entry.name.unwrap_or_default(),
                distance_km: entry.distance.map(|d| d.value),
            })
        }))
    }
}

/// Cheapest of the returned offers; offers with unparseable totals are
/// skipped.
fn cheapest_offer(offers: &[FlightOffer]) -> Option<Fare> {
    offers
        .iter()
        .filter_map(|offer| {
            let price: f64 = offer.price.total.parse().ok()?;
            Some(Fare {
                price,
                currency: offer.price.currency.clone(),
            })
        })
        .min_by(|a, b| a.price.total_cmp(&b.price))
}

/// Map HTTP status codes onto the provider error taxonomy
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(ProviderError::Auth(format!(
            "{what} rejected with {status}: {body}"
        ))),
        429 => Err(ProviderError::RateLimit(format!(
            "{what} rate limited: {body}"
        ))),
        _ => Err(ProviderError::Api(format!(
            "{what} failed with {status}: {body}"
        ))),
    }
}
