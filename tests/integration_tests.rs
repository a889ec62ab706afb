//! End-to-end tests of the validation and selection pipeline against
//! in-memory providers

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use tripsmith::providers::{
    AirportResolver, DraftGenerator, PricingService, ProviderError, Result as ProviderResult,
};
use tripsmith::{
    DraftPlan, Fare, GenerationConstraints, Itinerary, NearbyAirport, PlanValidator, Strategy,
    TravelPlanner,
};

/// Pricing table keyed by (origin, destination); deterministic and
/// date-independent so validations are reproducible
struct TablePricing {
    fares: HashMap<(String, String), f64>,
}

impl TablePricing {
    fn new(fares: &[(&str, &str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            fares: fares
                .iter()
                .map(|(o, d, p)| ((o.to_string(), d.to_string()), *p))
                .collect(),
        })
    }
}

#[async_trait]
impl PricingService for TablePricing {
    async fn cheapest_fare(
        &self,
        origin: &str,
        destination: &str,
        _departure: NaiveDate,
        _passengers: u32,
    ) -> ProviderResult<Option<Fare>> {
        Ok(self
            .fares
            .get(&(origin.to_string(), destination.to_string()))
            .map(|price| Fare {
                price: *price,
                currency: "EUR".to_string(),
            }))
    }
}

struct TableAirports {
    cities: HashMap<String, String>,
}

impl TableAirports {
    fn new(cities: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            cities: cities
                .iter()
                .map(|(c, a)| (c.to_string(), a.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl AirportResolver for TableAirports {
    async fn resolve_airport(
        &self,
        city: &str,
        _country: Option<&str>,
    ) -> ProviderResult<Option<String>> {
        Ok(self.cities.get(city).cloned())
    }

    async fn nearest_airport(&self, _lat: f64, _lon: f64) -> ProviderResult<Option<NearbyAirport>> {
        Ok(None)
    }
}

/// Generator that replays a scripted sequence of raw outputs and counts
/// how often it was asked
struct ScriptedGenerator {
    outputs: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(outputs: &[&str]) -> Arc<Self> {
        let mut outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        outputs.reverse();
        Arc::new(Self {
            outputs: Mutex::new(outputs),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftGenerator for ScriptedGenerator {
    async fn generate_draft(
        &self,
        _constraints: &GenerationConstraints,
    ) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outputs
            .lock()
            .await
            .pop()
            .ok_or_else(|| ProviderError::Transport("generator unreachable".to_string()))
    }
}

fn constraints(candidates: usize) -> GenerationConstraints {
    GenerationConstraints {
        strategy: Strategy::Random,
        starting_point: "Berlin".to_string(),
        starting_airport: "BER".to_string(),
        budget: 500.0,
        travel_length: 7,
        preferences: vec![],
        visited_places: vec![],
        candidates,
    }
}

fn itinerary(raw: &str) -> Itinerary {
    serde_json::from_str(raw).unwrap()
}

const ROME_TRIP: &str = r#"{
    "startingPoint": "Berlin", "tripLengthDays": 7, "strategy": "random",
    "plan": [
        {"city": "Berlin", "country": "Germany", "days": 1, "transportFromPreviousCity": "none"},
        {"city": "Rome", "country": "Italy", "days": 4, "transportFromPreviousCity": "flight"},
        {"city": "Naples", "country": "Italy", "days": 2, "transportFromPreviousCity": "train"}
    ]
}"#;

const NOWHERE_TRIP: &str = r#"{
    "startingPoint": "Berlin", "tripLengthDays": 7, "strategy": "random",
    "plan": [
        {"city": "Berlin", "country": "Germany", "days": 1, "transportFromPreviousCity": "none"},
        {"city": "Atlantis", "country": "Nowhere", "days": 6, "transportFromPreviousCity": "flight"}
    ]
}"#;

fn validator(fares: &[(&str, &str, f64)], cities: &[(&str, &str)]) -> PlanValidator {
    PlanValidator::new(TablePricing::new(fares), TableAirports::new(cities))
}

#[tokio::test]
async fn test_validate_full_trip_within_budget() {
    let validator = validator(&[("BER", "FCO", 120.0)], &[("Rome", "FCO")]);

    let verdict = validator
        .validate(&itinerary(ROME_TRIP), "BER", 500.0, 7)
        .await
        .unwrap();

    assert!(verdict.valid);
    assert_eq!(verdict.total_price, 170.0);
    assert_eq!(verdict.remaining_budget, 330.0);
    assert_eq!(verdict.cost_breakdown.flights, 120.0);
    assert_eq!(verdict.cost_breakdown.transport, 50.0);
    assert_eq!(verdict.reason, "Plan validated successfully");
    assert_eq!(verdict.segments.len(), 3);
    assert_eq!(
        verdict.segments[1].destination_airport.as_deref(),
        Some("FCO")
    );
}

#[tokio::test]
async fn test_validation_is_idempotent() {
    let validator = validator(&[("BER", "FCO", 120.0)], &[("Rome", "FCO")]);
    let trip = itinerary(ROME_TRIP);

    let first = validator.validate(&trip, "BER", 500.0, 7).await.unwrap();
    let second = validator.validate(&trip, "BER", 500.0, 7).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn test_unresolvable_city_names_the_city() {
    let validator = validator(&[], &[]);

    let verdict = validator
        .validate(&itinerary(NOWHERE_TRIP), "BER", 500.0, 7)
        .await
        .unwrap();

    assert!(!verdict.valid);
    assert!(
        verdict
            .errors
            .iter()
            .any(|e| e.contains("Atlantis") && e.contains("Nowhere"))
    );
    // One error: 100 points for untouched budget minus one 20 point penalty
    assert_eq!(verdict.score, 80.0);
}

#[tokio::test]
async fn test_exact_budget_trip_is_valid() {
    let validator = validator(&[("BER", "FCO", 450.0)], &[("Rome", "FCO")]);

    let verdict = validator
        .validate(&itinerary(ROME_TRIP), "BER", 500.0, 7)
        .await
        .unwrap();

    assert!(verdict.valid);
    assert_eq!(verdict.total_price, 500.0);
    assert_eq!(verdict.remaining_budget, 0.0);
}

#[tokio::test]
async fn test_planner_validates_parsed_and_raw_drafts() {
    let planner = TravelPlanner::new(
        ScriptedGenerator::new(&[]),
        validator(&[("BER", "FCO", 120.0)], &[("Rome", "FCO")]),
    );

    let parsed = DraftPlan::Itinerary(itinerary(ROME_TRIP));
    let verdict = planner.validate(&parsed, "BER", 500.0, 7).await.unwrap();
    assert!(verdict.valid);
    assert_eq!(verdict.total_price, 170.0);

    let raw = DraftPlan::Raw {
        raw: "not a plan".to_string(),
    };
    let verdict = planner.validate(&raw, "BER", 500.0, 7).await.unwrap();
    assert!(!verdict.valid);
    assert_eq!(verdict.reason, "Invalid plan structure");
}

#[tokio::test]
async fn test_generate_and_validate_returns_on_first_valid() {
    let generator = ScriptedGenerator::new(&[ROME_TRIP, ROME_TRIP, ROME_TRIP]);
    let planner = TravelPlanner::new(
        generator.clone(),
        validator(&[("BER", "FCO", 120.0)], &[("Rome", "FCO")]),
    );

    let outcome = planner
        .generate_and_validate(&constraints(1), Some(3))
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.validation.unwrap().valid);
    assert!(matches!(outcome.selected_plan, DraftPlan::Itinerary(_)));
}

#[tokio::test]
async fn test_generate_and_validate_respects_retry_bound() {
    let generator =
        ScriptedGenerator::new(&[NOWHERE_TRIP, NOWHERE_TRIP, NOWHERE_TRIP, NOWHERE_TRIP]);
    let planner = TravelPlanner::new(generator.clone(), validator(&[], &[]));

    let outcome = planner
        .generate_and_validate(&constraints(1), Some(3))
        .await
        .unwrap();

    // Invoked at most maxAttempts times, last invalid verdict kept
    assert_eq!(generator.calls(), 3);
    assert_eq!(outcome.attempts, 3);
    let validation = outcome.validation.unwrap();
    assert!(!validation.valid);
    assert!(validation.errors.iter().any(|e| e.contains("Atlantis")));
}

#[tokio::test]
async fn test_parse_failure_surfaces_raw_text_without_retrying() {
    let generator = ScriptedGenerator::new(&[
        "Sorry, I cannot help with that.",
        ROME_TRIP,
        ROME_TRIP,
    ]);
    let planner = TravelPlanner::new(
        generator.clone(),
        validator(&[("BER", "FCO", 120.0)], &[("Rome", "FCO")]),
    );

    let outcome = planner
        .generate_and_validate(&constraints(1), Some(3))
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(outcome.validation.is_none());
    match outcome.selected_plan {
        DraftPlan::Raw { raw } => assert_eq!(raw, "Sorry, I cannot help with that."),
        other => panic!("expected raw fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_selection_picks_best_valid_candidate() {
    // Batch of three: one unresolvable (invalid), one expensive valid, one
    // cheap valid; the cheap one must win on score.
    let batch = format!(
        r#"[{NOWHERE_TRIP},
        {{"startingPoint":"Berlin","tripLengthDays":7,"strategy":"random",
          "plan":[{{"city":"Berlin","country":"Germany","days":1,"transportFromPreviousCity":"none"}},
                  {{"city":"Paris","country":"France","days":6,"transportFromPreviousCity":"flight"}}]}},
        {{"startingPoint":"Berlin","tripLengthDays":7,"strategy":"random",
          "plan":[{{"city":"Berlin","country":"Germany","days":1,"transportFromPreviousCity":"none"}},
                  {{"city":"Rome","country":"Italy","days":6,"transportFromPreviousCity":"flight"}}]}}]"#
    );
    let generator = ScriptedGenerator::new(&[&batch]);
    let planner = TravelPlanner::new(
        generator.clone(),
        validator(
            &[("BER", "FCO", 150.0), ("BER", "CDG", 300.0)],
            &[("Rome", "FCO"), ("Paris", "CDG")],
        ),
    );

    let outcome = planner
        .generate_and_validate(&constraints(3), Some(3))
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(outcome.candidates.len(), 3);

    let best = outcome.validation.unwrap();
    assert!(best.valid);
    assert_eq!(best.total_price, 150.0);
    assert_eq!(best.score, 70.0);

    // Ranked order: valid cheap, valid expensive, invalid
    assert!(outcome.candidates[0].validation.valid);
    assert!(outcome.candidates[1].validation.valid);
    assert!(!outcome.candidates[2].validation.valid);
    match outcome.selected_plan {
        DraftPlan::Itinerary(itinerary) => assert_eq!(itinerary.plan[1].city, "Rome"),
        other => panic!("expected itinerary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_with_no_valid_candidate_still_selects() {
    let batch = format!("[{NOWHERE_TRIP},{NOWHERE_TRIP}]");
    let generator = ScriptedGenerator::new(&[&batch, &batch, &batch]);
    let planner = TravelPlanner::new(generator.clone(), validator(&[], &[]));

    let outcome = planner
        .generate_and_validate(&constraints(2), Some(3))
        .await
        .unwrap();

    // All rounds exhausted, highest scoring invalid candidate returned
    assert_eq!(generator.calls(), 3);
    assert_eq!(outcome.candidates.len(), 6);
    let validation = outcome.validation.unwrap();
    assert!(!validation.valid);
    assert!(matches!(outcome.selected_plan, DraftPlan::Itinerary(_)));
}

#[tokio::test]
async fn test_unreachable_generator_is_a_hard_error() {
    let generator = ScriptedGenerator::new(&[]);
    let planner = TravelPlanner::new(generator.clone(), validator(&[], &[]));

    let err = planner
        .generate_and_validate(&constraints(1), Some(3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        tripsmith::TripSmithError::Generator { .. }
    ));
}
