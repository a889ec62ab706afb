//! Facade over the generate-and-validate pipeline
//!
//! Dispatches a request to the single-itinerary retry loop or to the
//! multi-candidate selector depending on how many competing drafts were
//! requested, and normalizes both into one [`SelectionOutcome`].

use std::sync::Arc;

use tracing::instrument;

use crate::error::TripSmithError;
use crate::models::{Candidate, DraftPlan, GenerationConstraints, SelectionOutcome};
use crate::providers::DraftGenerator;
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryController, RetryOutcome};
use crate::selector::CandidateSelector;
use crate::validator::PlanValidator;

pub struct TravelPlanner {
    generator: Arc<dyn DraftGenerator>,
    validator: PlanValidator,
    max_attempts: u32,
}

impl TravelPlanner {
    pub fn new(generator: Arc<dyn DraftGenerator>, validator: PlanValidator) -> Self {
        Self {
            generator,
            validator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Validate a single already-drafted plan, parsed or raw
    pub async fn validate(
        &self,
        draft: &DraftPlan,
        starting_airport: &str,
        budget: f64,
        trip_length_days: u32,
    ) -> Result<crate::models::PlanValidation, TripSmithError> {
        self.validator
            .validate_draft(draft, starting_airport, budget, trip_length_days)
            .await
    }

    /// Generate drafts and validate until one passes or attempts run out
    #[instrument(skip(self, constraints), fields(strategy = %constraints.strategy))]
    pub async fn generate_and_validate(
        &self,
        constraints: &GenerationConstraints,
        max_attempts: Option<u32>,
    ) -> Result<SelectionOutcome, TripSmithError> {
        let bound = max_attempts.unwrap_or(self.max_attempts).max(1);

        if constraints.candidates > 1 {
            let selector = CandidateSelector::new(self.generator.as_ref(), &self.validator, bound);
            return selector.run(constraints).await;
        }

        let controller = RetryController::new(self.generator.as_ref(), &self.validator, bound);
        let outcome = controller.run(constraints).await?;
        Ok(Self::outcome_from_retry(outcome))
    }

    fn outcome_from_retry(outcome: RetryOutcome) -> SelectionOutcome {
        let candidates = match (&outcome.plan, &outcome.validation) {
            (DraftPlan::Itinerary(itinerary), Some(validation)) => vec![Candidate {
                itinerary: itinerary.clone(),
                validation: validation.clone(),
            }],
            _ => Vec::new(),
        };
        SelectionOutcome {
            selected_plan: outcome.plan,
            validation: outcome.validation,
            candidates,
            attempts: outcome.attempts,
        }
    }
}
