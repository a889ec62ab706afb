//! Bounded generate-and-validate loop for a single itinerary
//!
//! Modeled as an explicit state machine driven by an attempt counter so the
//! bound is trivially verifiable: `Generating` asks the model for a draft,
//! `Validating` prices it, and the loop is done on the first valid plan, on
//! a structural parse failure, or when attempts run out. An exhausted loop
//! still returns the last computed (invalid) verdict rather than discarding
//! it.

use tracing::instrument;

use crate::error::TripSmithError;
use crate::models::{DraftPlan, GenerationConstraints, Itinerary, PlanValidation};
use crate::parser;
use crate::providers::DraftGenerator;
use crate::validator::PlanValidator;

/// Default bound on generation attempts per itinerary
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

enum RetryState {
    Generating,
    Validating(Itinerary),
}

/// Result of a retry run; `validation` is `None` only when the draft never
/// parsed (raw fallback) or every validation pass aborted before finishing
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub plan: DraftPlan,
    pub validation: Option<PlanValidation>,
    pub attempts: u32,
}

/// Regenerates and revalidates one itinerary up to a bounded number of
/// attempts. Purely sequential; the model inference call dominates cost.
pub struct RetryController<'a> {
    generator: &'a dyn DraftGenerator,
    validator: &'a PlanValidator,
    max_attempts: u32,
}

impl<'a> RetryController<'a> {
    pub fn new(
        generator: &'a dyn DraftGenerator,
        validator: &'a PlanValidator,
        max_attempts: u32,
    ) -> Self {
        Self {
            generator,
            validator,
            max_attempts: max_attempts.max(1),
        }
    }

    #[instrument(skip(self, constraints), fields(strategy = %constraints.strategy, max_attempts = self.max_attempts))]
    pub async fn run(
        &self,
        constraints: &GenerationConstraints,
    ) -> Result<RetryOutcome, TripSmithError> {
        let mut attempts: u32 = 0;
        let mut last: Option<(Itinerary, PlanValidation)> = None;
        // Drafts whose validation pass aborted; kept so an all-aborted run
        // still hands the caller a plan instead of a bare error
        let mut last_unvalidated: Option<Itinerary> = None;
        let mut state = RetryState::Generating;

        loop {
            state = match state {
                RetryState::Generating => {
                    if attempts >= self.max_attempts {
                        tracing::info!(attempts, "attempts exhausted, returning last verdict");
                        return Self::best_effort(last, last_unvalidated, attempts);
                    }
                    attempts += 1;

                    let raw = match self.generator.generate_draft(constraints).await {
                        Ok(raw) => raw,
                        Err(e) => {
                            // Best effort: keep what an earlier attempt
                            // produced, fail only with nothing in hand
                            if last.is_some() || last_unvalidated.is_some() {
                                tracing::warn!(error = %e, "generator failed, keeping earlier draft");
                                return Self::best_effort(last, last_unvalidated, attempts);
                            }
                            return Err(TripSmithError::generator(e.to_string()));
                        }
                    };

                    match parser::parse_draft(&raw) {
                        Ok(itinerary) => RetryState::Validating(itinerary),
                        Err(_) => {
                            // Structural failure ends the loop immediately,
                            // no further regeneration
                            tracing::warn!(attempts, "draft did not parse, stopping retries");
                            if last.is_some() || last_unvalidated.is_some() {
                                return Self::best_effort(last, last_unvalidated, attempts);
                            }
                            return Ok(RetryOutcome {
                                plan: DraftPlan::Raw { raw },
                                validation: None,
                                attempts,
                            });
                        }
                    }
                }
                RetryState::Validating(itinerary) => {
                    let verdict = self
                        .validator
                        .validate(
                            &itinerary,
                            &constraints.starting_airport,
                            constraints.budget,
                            constraints.travel_length,
                        )
                        .await;

                    match verdict {
                        Ok(validation) if validation.valid => {
                            tracing::info!(attempts, score = validation.score, "plan validated");
                            return Ok(RetryOutcome {
                                plan: DraftPlan::Itinerary(itinerary),
                                validation: Some(validation),
                                attempts,
                            });
                        }
                        Ok(validation) => {
                            tracing::debug!(attempts, score = validation.score, "plan invalid");
                            last = Some((itinerary, validation));
                            RetryState::Generating
                        }
                        Err(TripSmithError::Transport { message }) => {
                            // The pass aborted; count it as a failed attempt
                            // but keep the draft
                            tracing::warn!(attempts, %message, "validation pass aborted");
                            last_unvalidated = Some(itinerary);
                            RetryState::Generating
                        }
                        Err(e) => return Err(e),
                    }
                }
            };
        }
    }

    /// A validated draft beats an unvalidated one; the generator is declared
    /// unreachable only with nothing at all in hand
    fn best_effort(
        last: Option<(Itinerary, PlanValidation)>,
        last_unvalidated: Option<Itinerary>,
        attempts: u32,
    ) -> Result<RetryOutcome, TripSmithError> {
        if let Some((itinerary, validation)) = last {
            return Ok(RetryOutcome {
                plan: DraftPlan::Itinerary(itinerary),
                validation: Some(validation),
                attempts,
            });
        }
        if let Some(itinerary) = last_unvalidated {
            return Ok(RetryOutcome {
                plan: DraftPlan::Itinerary(itinerary),
                validation: None,
                attempts,
            });
        }
        Err(TripSmithError::generator("No draft was ever produced"))
    }
}
