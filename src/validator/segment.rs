//! Per-segment validation with explicit running state

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::error::TripSmithError;
use crate::models::{Segment, SegmentValidation, TransportMode, round2};
use crate::providers::{AirportResolver, PricingService};

/// Running state threaded through the ordered fold over segments.
///
/// The airport only moves forward on a successfully priced flight, so an
/// unresolved segment never propagates a bogus origin into later lookups.
/// The date, in contrast, advances unconditionally: the traveller is at
/// *some* city on day N whether or not we managed to price getting there.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub airport: Option<String>,
    pub date: NaiveDate,
    pub remaining_budget: f64,
}

impl Cursor {
    /// Start-of-trip cursor; a blank starting airport means "unknown"
    #[must_use]
    pub fn start(starting_airport: &str, date: NaiveDate, budget: f64) -> Self {
        let airport = starting_airport.trim();
        Self {
            airport: (!airport.is_empty()).then(|| airport.to_uppercase()),
            date,
            remaining_budget: budget,
        }
    }
}

/// Resolves airports and prices a single segment
#[derive(Clone)]
pub struct SegmentValidator {
    pricing: Arc<dyn PricingService>,
    airports: Arc<dyn AirportResolver>,
    surface_cost: f64,
}

impl SegmentValidator {
    pub fn new(
        pricing: Arc<dyn PricingService>,
        airports: Arc<dyn AirportResolver>,
        surface_cost: f64,
    ) -> Self {
        Self {
            pricing,
            airports,
            surface_cost,
        }
    }

    /// Validate one segment and advance the cursor.
    ///
    /// Lookup failures become data on the returned record; only a
    /// transport-layer failure of a provider call is an `Err`, which aborts
    /// the whole validation pass.
    pub async fn validate(
        &self,
        segment: &Segment,
        cursor: &mut Cursor,
    ) -> Result<SegmentValidation, TripSmithError> {
        let mut record = SegmentValidation::pending(segment);

        if segment.transport_from_previous_city.is_flight() {
            self.validate_flight(segment, cursor, &mut record).await?;
        } else {
            let cost = if matches!(
                segment.transport_from_previous_city,
                TransportMode::Train | TransportMode::Bus
            ) {
                self.surface_cost
            } else {
                // Ferries and the leading "none" segment are free
                0.0
            };
            record.validated = true;
            record.price = cost;
            cursor.remaining_budget -= cost;
        }

        // Calendar state is monotonic, even past a failed segment
        cursor.date += Duration::days(i64::from(segment.days));

        Ok(record)
    }

    async fn validate_flight(
        &self,
        segment: &Segment,
        cursor: &mut Cursor,
        record: &mut SegmentValidation,
    ) -> Result<(), TripSmithError> {
        let destination = match segment.iata.as_deref() {
            Some(code) if !code.trim().is_empty() => Some(code.trim().to_uppercase()),
            _ => self.resolve_destination(segment).await?,
        };

        let Some(destination) = destination else {
            record.error = Some(format!(
                "Could not find airport for destination city {}, {}",
                segment.city, segment.country
            ));
            return Ok(());
        };

        let Some(origin) = cursor.airport.clone() else {
            record.error = Some("Could not find origin airport".to_string());
            return Ok(());
        };

        match self
            .pricing
            .cheapest_fare(&origin, &destination, cursor.date, 1)
            .await
        {
            Ok(None) => {
                record.error = Some("No flights available".to_string());
            }
            Ok(Some(fare)) if fare.price <= cursor.remaining_budget => {
                record.validated = true;
                record.price = fare.price;
                record.origin_airport = Some(origin);
                record.destination_airport = Some(destination.clone());
                cursor.remaining_budget -= fare.price;
                cursor.airport = Some(destination);
            }
            Ok(Some(fare)) => {
                record.error = Some(format!(
                    "Price {} exceeds budget {}",
                    fare.price,
                    round2(cursor.remaining_budget)
                ));
            }
            Err(e) if e.is_transport() => {
                return Err(TripSmithError::transport(e.to_string()));
            }
            Err(e) => {
                record.error = Some(format!("Error validating flight: {e}"));
            }
        }

        Ok(())
    }

    /// City-to-airport lookup; a failed lookup is the same as an unknown city
    async fn resolve_destination(&self, segment: &Segment) -> Result<Option<String>, TripSmithError> {
        let country = (!segment.country.trim().is_empty()).then_some(segment.country.as_str());
        match self.airports.resolve_airport(&segment.city, country).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_transport() => Err(TripSmithError::transport(e.to_string())),
            Err(e) => {
                tracing::debug!(city = %segment.city, error = %e, "airport lookup failed");
                Ok(None)
            }
        }
    }
}
