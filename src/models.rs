//! Data models for itineraries, validation results and provider responses
//!
//! Itinerary JSON is camelCase because it is produced by the generator prompt
//! schema; validation JSON is snake_case because it is produced by this
//! service. Parsing is deliberately lenient: generator output frequently
//! omits optional fields, so most of them carry serde defaults.

use serde::{Deserialize, Serialize};

/// How a segment is reached from the previous city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Train,
    Bus,
    Flight,
    Ferry,
    /// The first segment of every itinerary; no transport happens
    #[default]
    None,
}

impl TransportMode {
    /// Surface modes are priced with a flat nominal cost, flights are priced live
    #[must_use]
    pub fn is_flight(self) -> bool {
        matches!(self, TransportMode::Flight)
    }
}

/// Generation mode constraining destination choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Visited,
    Unvisited,
    #[default]
    Random,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Visited => write!(f, "visited"),
            Strategy::Unvisited => write!(f, "unvisited"),
            Strategy::Random => write!(f, "random"),
        }
    }
}

/// One leg of an itinerary: destination, dwell duration, arrival transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Destination city name
    #[serde(default)]
    pub city: String,
    /// Destination country (name or ISO code, whatever the generator emitted)
    #[serde(default)]
    pub country: String,
    /// Airport code when the generator already committed to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iata: Option<String>,
    /// Days spent at the destination
    #[serde(default = "default_days")]
    pub days: u32,
    /// Transport used to reach this city from the previous one
    #[serde(default)]
    pub transport_from_previous_city: TransportMode,
}

fn default_days() -> u32 {
    1
}

/// An unvalidated, generator-produced ordered sequence of city segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default)]
    pub starting_point: String,
    #[serde(default)]
    pub trip_length_days: u32,
    #[serde(default)]
    pub strategy: Strategy,
    /// The `plan` key is the one thing a draft must carry to count as parsed
    pub plan: Vec<Segment>,
}

/// Per-segment validation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentValidation {
    pub segment: Segment,
    pub validated: bool,
    pub price: f64,
    pub error: Option<String>,
    pub origin_airport: Option<String>,
    pub destination_airport: Option<String>,
}

impl SegmentValidation {
    /// Fresh, not-yet-validated record for a segment
    #[must_use]
    pub fn pending(segment: &Segment) -> Self {
        Self {
            segment: segment.clone(),
            validated: false,
            price: 0.0,
            error: None,
            origin_airport: None,
            destination_airport: None,
        }
    }
}

/// Flight vs. surface-transport subtotals over validated segments
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub flights: f64,
    pub transport: f64,
}

/// Aggregated validation verdict for a whole itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanValidation {
    pub valid: bool,
    pub total_price: f64,
    pub budget: f64,
    pub remaining_budget: f64,
    pub cost_breakdown: CostBreakdown,
    pub segments: Vec<SegmentValidation>,
    pub errors: Vec<String>,
    pub score: f64,
    pub reason: String,
}

impl PlanValidation {
    /// Verdict for a draft that never reached segment validation
    #[must_use]
    pub fn rejected(reason: impl Into<String>, budget: f64) -> Self {
        let reason = reason.into();
        Self {
            valid: false,
            total_price: 0.0,
            budget,
            remaining_budget: budget,
            cost_breakdown: CostBreakdown::default(),
            segments: Vec::new(),
            errors: vec![reason.clone()],
            score: 0.0,
            reason,
        }
    }
}

/// A parsed draft, or the raw generator text when parsing failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftPlan {
    Itinerary(Itinerary),
    Raw { raw: String },
}

/// One itinerary among several competing proposals for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub itinerary: Itinerary,
    pub validation: PlanValidation,
}

/// Cheapest available fare for a flight segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fare {
    pub price: f64,
    pub currency: String,
}

/// Nearest-airport lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyAirport {
    pub iata: String,
    pub name: String,
    pub distance_km: Option<f64>,
}

/// Everything the generator needs to produce a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    pub strategy: Strategy,
    pub starting_point: String,
    pub starting_airport: String,
    pub budget: f64,
    pub travel_length: u32,
    pub preferences: Vec<String>,
    pub visited_places: Vec<String>,
    /// How many competing drafts to request per generation round
    pub candidates: usize,
}

/// Result of the generate-and-validate pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub selected_plan: DraftPlan,
    pub validation: Option<PlanValidation>,
    /// All candidates seen across retry rounds, best first
    pub candidates: Vec<Candidate>,
    pub attempts: u32,
}

/// Round monetary values and scores the way the wire format expects
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
