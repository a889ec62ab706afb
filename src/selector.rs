//! Batch validation and ranking of competing draft itineraries
//!
//! Each retry round regenerates the whole batch, validates every candidate
//! concurrently (candidates share no state, so this is purely a latency
//! optimization) and stops early once the round produced at least one valid
//! plan. Candidates accumulate across rounds and the ranked list is exposed
//! to the caller; even when nothing ever validates, the highest-scoring
//! invalid candidate is still returned.

use futures::future::join_all;
use tracing::instrument;

use crate::error::TripSmithError;
use crate::models::{Candidate, DraftPlan, GenerationConstraints, PlanValidation, SelectionOutcome};
use crate::parser;
use crate::providers::DraftGenerator;
use crate::validator::PlanValidator;

/// Validates and ranks batches of competing itineraries
pub struct CandidateSelector<'a> {
    generator: &'a dyn DraftGenerator,
    validator: &'a PlanValidator,
    max_attempts: u32,
}

impl<'a> CandidateSelector<'a> {
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

    #[instrument(skip(self, constraints), fields(strategy = %constraints.strategy, batch = constraints.candidates))]
    pub async fn run(
        &self,
        constraints: &GenerationConstraints,
    ) -> Result<SelectionOutcome, TripSmithError> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut attempts: u32 = 0;

        while attempts < self.max_attempts {
            attempts += 1;

            let raw = match self.generator.generate_draft(constraints).await {
                Ok(raw) => raw,
                Err(e) if candidates.is_empty() => {
                    return Err(TripSmithError::generator(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "generator failed, ranking what we have");
                    break;
                }
            };

            let drafts = match parser::parse_drafts(&raw) {
                Ok(drafts) => drafts,
                Err(_) if candidates.is_empty() => {
                    // Structural failure before anything accumulated:
                    // surface the raw text, unvalidated
                    tracing::warn!(attempts, "batch did not parse, returning raw fallback");
                    return Ok(SelectionOutcome {
                        selected_plan: DraftPlan::Raw { raw },
                        validation: None,
                        candidates: Vec::new(),
                        attempts,
                    });
                }
                Err(_) => {
                    tracing::warn!(attempts, "batch did not parse, stopping retries");
                    break;
                }
            };

            let verdicts = join_all(drafts.iter().map(|draft| {
                self.validator.validate(
                    draft,
                    &constraints.starting_airport,
                    constraints.budget,
                    constraints.travel_length,
                )
            }))
            .await;

            let mut round_has_valid = false;
            for (itinerary, verdict) in drafts.into_iter().zip(verdicts) {
                let validation = match verdict {
                    Ok(validation) => validation,
                    Err(TripSmithError::Transport { message }) => {
                        // Keep the ranking total: an aborted pass becomes a
                        // zero-score invalid placeholder
                        PlanValidation::rejected(
                            format!("Validation aborted: {message}"),
                            constraints.budget,
                        )
                    }
                    Err(e) => return Err(e),
                };
                round_has_valid |= validation.valid;
                candidates.push(Candidate {
                    itinerary,
                    validation,
                });
            }

            if round_has_valid {
                tracing::info!(attempts, "round produced a valid candidate");
                break;
            }
        }

        rank_candidates(&mut candidates);

        let best = candidates.first().ok_or_else(|| {
            TripSmithError::general("Selector finished without any candidates")
        })?;

        Ok(SelectionOutcome {
            selected_plan: DraftPlan::Itinerary(best.itinerary.clone()),
            validation: Some(best.validation.clone()),
            candidates: candidates.clone(),
            attempts,
        })
    }
}

/// Sort candidates best first: validity, then score, then cheaper total
/// price as a tie-break only.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.validation
            .valid
            .cmp(&a.validation.valid)
            .then_with(|| b.validation.score.total_cmp(&a.validation.score))
            .then_with(|| {
                a.validation
                    .total_price
                    .total_cmp(&b.validation.total_price)
            })
    });
}
