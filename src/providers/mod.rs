//! External collaborators of the validation pipeline
//!
//! The core components only ever see these traits, so every provider can be
//! swapped for an in-memory mock in tests:
//! - [`PricingService`]: cheapest-fare lookup (Amadeus)
//! - [`AirportResolver`]: city-to-IATA and nearest-airport lookup
//!   (Amadeus, or the bundled offline directory)
//! - [`DraftGenerator`]: raw itinerary drafting (Ollama)

pub mod amadeus;
pub mod directory;
pub mod error;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Fare, GenerationConstraints, NearbyAirport};

pub use amadeus::AmadeusClient;
pub use directory::AirportDirectory;
pub use error::{ProviderError, Result};
pub use ollama::OllamaGenerator;

/// Live flight pricing
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Cheapest available fare for the route on the given day, or `None`
    /// when no flights are offered at all.
    async fn cheapest_fare(
        &self,
        origin: &str,
        destination: &str,
        departure: NaiveDate,
        passengers: u32,
    ) -> Result<Option<Fare>>;
}

/// City and coordinate to airport resolution
#[async_trait]
pub trait AirportResolver: Send + Sync {
    /// IATA code of the main airport serving a city, or `None` when the
    /// city cannot be resolved.
    async fn resolve_airport(&self, city: &str, country: Option<&str>) -> Result<Option<String>>;

    /// Closest airport to a coordinate pair
    async fn nearest_airport(&self, lat: f64, lon: f64) -> Result<Option<NearbyAirport>>;
}

/// Draft itinerary generation
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Raw generator output: ideally the JSON the prompt asked for, but
    /// possibly fenced or malformed. Parsing is the caller's problem.
    async fn generate_draft(&self, constraints: &GenerationConstraints) -> Result<String>;
}
