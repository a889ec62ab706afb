//! Whole-itinerary validation and scoring

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::instrument;

use crate::error::TripSmithError;
use crate::models::{CostBreakdown, DraftPlan, Itinerary, PlanValidation, round2};
use crate::providers::{AirportResolver, PricingService};
use crate::validator::segment::{Cursor, SegmentValidator};

/// Default flat cost applied to train and bus segments
pub const DEFAULT_SURFACE_COST: f64 = 50.0;

/// Default days between "now" and the first departure
pub const DEFAULT_LEAD_TIME_DAYS: u32 = 7;

/// Flat score penalty per accumulated error. Not normalized by itinerary
/// length; scores only rank candidates within one request.
const ERROR_PENALTY: f64 = 20.0;

/// Validates a whole itinerary by folding the segment validator over its
/// segments in order
#[derive(Clone)]
pub struct PlanValidator {
    segments: SegmentValidator,
    lead_time_days: u32,
}

impl PlanValidator {
    pub fn new(pricing: Arc<dyn PricingService>, airports: Arc<dyn AirportResolver>) -> Self {
        Self::with_settings(
            pricing,
            airports,
            DEFAULT_SURFACE_COST,
            DEFAULT_LEAD_TIME_DAYS,
        )
    }

    pub fn with_settings(
        pricing: Arc<dyn PricingService>,
        airports: Arc<dyn AirportResolver>,
        surface_cost: f64,
        lead_time_days: u32,
    ) -> Self {
        Self {
            segments: SegmentValidator::new(pricing, airports, surface_cost),
            lead_time_days,
        }
    }

    /// Validate a draft that may still be raw text.
    ///
    /// Raw drafts never reach segment validation; they are rejected with the
    /// structure reason straight away.
    pub async fn validate_draft(
        &self,
        draft: &DraftPlan,
        starting_airport: &str,
        budget: f64,
        trip_length_days: u32,
    ) -> Result<PlanValidation, TripSmithError> {
        match draft {
            DraftPlan::Itinerary(itinerary) => {
                self.validate(itinerary, starting_airport, budget, trip_length_days)
                    .await
            }
            DraftPlan::Raw { .. } => Ok(PlanValidation::rejected("Invalid plan structure", budget)),
        }
    }

    /// Validate an itinerary against a budget.
    ///
    /// Returns `Err` only when a provider call fails at the transport layer,
    /// aborting this pass; every per-segment problem is folded into the
    /// returned verdict instead.
    #[instrument(skip(self, itinerary), fields(segments = itinerary.plan.len()))]
    pub async fn validate(
        &self,
        itinerary: &Itinerary,
        starting_airport: &str,
        budget: f64,
        trip_length_days: u32,
    ) -> Result<PlanValidation, TripSmithError> {
        if itinerary.plan.is_empty() {
            return Ok(PlanValidation::rejected("Plan has no segments", budget));
        }

        tracing::debug!(budget, trip_length_days, "validating itinerary");

        let departure = Utc::now().date_naive() + Duration::days(i64::from(self.lead_time_days));
        let mut cursor = Cursor::start(starting_airport, departure, budget);

        let mut segments = Vec::with_capacity(itinerary.plan.len());
        let mut errors = Vec::new();

        for segment in &itinerary.plan {
            let record = self.segments.validate(segment, &mut cursor).await?;
            if let Some(error) = &record.error {
                errors.push(error.clone());
            }
            segments.push(record);
        }

        let mut breakdown = CostBreakdown::default();
        for record in segments.iter().filter(|s| s.validated) {
            if record.segment.transport_from_previous_city.is_flight() {
                breakdown.flights += record.price;
            } else {
                breakdown.transport += record.price;
            }
        }
        let total_price = breakdown.flights + breakdown.transport;
        breakdown.flights = round2(breakdown.flights);
        breakdown.transport = round2(breakdown.transport);

        let valid = errors.is_empty() && total_price <= budget;
        let score = score(budget, total_price, errors.len());
        let reason = if valid {
            "Plan validated successfully".to_string()
        } else if errors.is_empty() {
            format!("Validation failed: Total price {total_price} exceeds budget {budget}")
        } else {
            format!("Validation failed: {}", errors.join(", "))
        };

        Ok(PlanValidation {
            valid,
            total_price: round2(total_price),
            budget,
            remaining_budget: round2(budget - total_price),
            cost_breakdown: breakdown,
            segments,
            errors,
            score,
            reason,
        })
    }
}

/// Score: unused budget share, minus a flat penalty per error, floored at 0.
fn score(budget: f64, total_price: f64, error_count: usize) -> f64 {
    let price_score = if budget > 0.0 {
        (((budget - total_price) / budget) * 100.0).max(0.0)
    } else {
        0.0
    };
    #[allow(clippy::cast_precision_loss)]
    let penalty = ERROR_PENALTY * error_count as f64;
    round2((price_score - penalty).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fare, NearbyAirport, Segment, Strategy, TransportMode};
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct FixedPricing {
        fares: HashMap<(String, String), f64>,
        fail_transport: bool,
    }

    #[async_trait]
    impl PricingService for FixedPricing {
        async fn cheapest_fare(
            &self,
            origin: &str,
            destination: &str,
            _departure: NaiveDate,
            _passengers: u32,
        ) -> crate::providers::Result<Option<Fare>> {
            if self.fail_transport {
                return Err(ProviderError::Transport("connection reset".to_string()));
            }
            Ok(self
                .fares
                .get(&(origin.to_string(), destination.to_string()))
                .map(|price| Fare {
                    price: *price,
                    currency: "EUR".to_string(),
                }))
        }
    }

    struct FixedAirports {
        cities: HashMap<String, String>,
    }

    #[async_trait]
    impl AirportResolver for FixedAirports {
        async fn resolve_airport(
            &self,
            city: &str,
            _country: Option<&str>,
        ) -> crate::providers::Result<Option<String>> {
            Ok(self.cities.get(city).cloned())
        }

        async fn nearest_airport(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> crate::providers::Result<Option<NearbyAirport>> {
            Ok(None)
        }
    }

    fn plan_validator(fares: &[(&str, &str, f64)], cities: &[(&str, &str)]) -> PlanValidator {
        PlanValidator::new(
            Arc::new(FixedPricing {
                fares: fares
                    .iter()
                    .map(|(o, d, p)| ((o.to_string(), d.to_string()), *p))
                    .collect(),
                fail_transport: false,
            }),
            Arc::new(FixedAirports {
                cities: cities
                    .iter()
                    .map(|(c, a)| (c.to_string(), a.to_string()))
                    .collect(),
            }),
        )
    }

    fn segment(city: &str, days: u32, mode: TransportMode) -> Segment {
        Segment {
            city: city.to_string(),
            country: "Testland".to_string(),
            iata: None,
            days,
            transport_from_previous_city: mode,
        }
    }

    fn itinerary(segments: Vec<Segment>) -> Itinerary {
        Itinerary {
            starting_point: "Berlin".to_string(),
            trip_length_days: segments.iter().map(|s| s.days).sum(),
            strategy: Strategy::Random,
            plan: segments,
        }
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected() {
        let validator = plan_validator(&[], &[]);
        let verdict = validator
            .validate(&itinerary(vec![]), "BER", 500.0, 7)
            .await
            .unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.reason, "Plan has no segments");
        assert_eq!(verdict.score, 0.0);
    }

    #[tokio::test]
    async fn test_raw_draft_is_invalid_plan_structure() {
        let validator = plan_validator(&[], &[]);
        let draft = DraftPlan::Raw {
            raw: "nope".to_string(),
        };
        let verdict = validator.validate_draft(&draft, "BER", 500.0, 7).await.unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.reason, "Invalid plan structure");
    }

    #[tokio::test]
    async fn test_surface_only_plan_depends_on_budget_alone() {
        let validator = plan_validator(&[], &[]);
        let trip = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Prague", 3, TransportMode::Train),
            segment("Vienna", 3, TransportMode::Bus),
        ]);

        let verdict = validator.validate(&trip, "BER", 500.0, 7).await.unwrap();
        assert!(verdict.valid);
        assert_eq!(verdict.total_price, 100.0);
        assert_eq!(verdict.cost_breakdown.flights, 0.0);
        assert_eq!(verdict.cost_breakdown.transport, 100.0);
        assert_eq!(verdict.score, 80.0);
        assert_eq!(verdict.reason, "Plan validated successfully");

        let broke = validator.validate(&trip, "BER", 80.0, 7).await.unwrap();
        assert!(!broke.valid);
        assert!(broke.errors.is_empty());
        assert_eq!(
            broke.reason,
            "Validation failed: Total price 100 exceeds budget 80"
        );
    }

    #[tokio::test]
    async fn test_exact_budget_is_valid_with_zero_remaining() {
        let validator = plan_validator(&[("BER", "FCO", 450.0)], &[("Rome", "FCO")]);
        let trip = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Rome", 4, TransportMode::Flight),
            segment("Naples", 2, TransportMode::Train),
        ]);

        let verdict = validator.validate(&trip, "BER", 500.0, 7).await.unwrap();
        assert!(verdict.valid);
        assert_eq!(verdict.total_price, 500.0);
        assert_eq!(verdict.remaining_budget, 0.0);
        assert_eq!(verdict.score, 0.0);
    }

    #[tokio::test]
    async fn test_each_error_costs_exactly_twenty_points() {
        // Two flights to unknown cities; total price stays 0 so the score
        // starts from 100.
        let validator = plan_validator(&[], &[]);
        let one_error = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Atlantis", 3, TransportMode::Flight),
        ]);
        let two_errors = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Atlantis", 3, TransportMode::Flight),
            segment("El Dorado", 3, TransportMode::Flight),
        ]);

        let one = validator.validate(&one_error, "BER", 500.0, 4).await.unwrap();
        let two = validator.validate(&two_errors, "BER", 500.0, 7).await.unwrap();

        assert_eq!(one.score, 80.0);
        assert_eq!(two.score, 60.0);
        assert!(two.errors.iter().any(|e| e.contains("El Dorado")));
    }

    #[tokio::test]
    async fn test_score_floors_at_zero() {
        assert_eq!(score(100.0, 0.0, 6), 0.0);
        assert_eq!(score(100.0, 0.0, 0), 100.0);
        assert_eq!(score(0.0, 0.0, 0), 0.0);
        assert_eq!(score(-10.0, 0.0, 0), 0.0);
    }

    #[tokio::test]
    async fn test_invalid_segment_price_does_not_accrue() {
        // First flight prices fine, second has no fares; only the first
        // contributes to the total.
        let validator = plan_validator(
            &[("BER", "FCO", 100.0)],
            &[("Rome", "FCO"), ("Oslo", "OSL")],
        );
        let trip = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Rome", 3, TransportMode::Flight),
            segment("Oslo", 3, TransportMode::Flight),
        ]);

        let verdict = validator.validate(&trip, "BER", 1000.0, 7).await.unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.total_price, 100.0);
        assert_eq!(verdict.errors, vec!["No flights available".to_string()]);
        // 90 from unused budget, minus one 20 point penalty
        assert_eq!(verdict.score, 70.0);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_the_pass() {
        let validator = PlanValidator::new(
            Arc::new(FixedPricing {
                fares: HashMap::new(),
                fail_transport: true,
            }),
            Arc::new(FixedAirports {
                cities: [("Rome".to_string(), "FCO".to_string())].into(),
            }),
        );
        let trip = itinerary(vec![
            segment("Berlin", 1, TransportMode::None),
            segment("Rome", 3, TransportMode::Flight),
        ]);

        let err = validator.validate(&trip, "BER", 500.0, 4).await.unwrap_err();
        assert!(matches!(err, TripSmithError::Transport { .. }));
    }
}
