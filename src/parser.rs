//! Lenient parsing of raw generator output into itineraries
//!
//! The grammar is deliberately small: optional surrounding whitespace, an
//! optional markdown code fence (with or without a language tag), then either
//! a single itinerary object or an array of them. Anything else is a
//! structural failure that carries the raw text back to the caller.

use crate::error::TripSmithError;
use crate::models::Itinerary;

/// Remove an optional surrounding markdown code fence.
///
/// `\`\`\`json\n{...}\n\`\`\`` and `\`\`\`\n{...}\n\`\`\`` both reduce to the
/// inner payload; input without a fence is only trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // First line holds the optional language tag
    let Some((_tag, body)) = rest.split_once('\n') else {
        return trimmed;
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Parse raw generator output into one or more draft itineraries.
///
/// A single JSON object is accepted as a batch of one; a JSON array yields a
/// batch in order. An empty array or non-JSON text is a
/// [`TripSmithError::Structural`] carrying the raw text.
pub fn parse_drafts(raw: &str) -> Result<Vec<Itinerary>, TripSmithError> {
    let payload = strip_code_fence(raw);

    if let Ok(itinerary) = serde_json::from_str::<Itinerary>(payload) {
        return Ok(vec![itinerary]);
    }

    if let Ok(batch) = serde_json::from_str::<Vec<Itinerary>>(payload) {
        if !batch.is_empty() {
            return Ok(batch);
        }
    }

    Err(TripSmithError::structural(raw))
}

/// Parse raw generator output expected to hold exactly one itinerary.
///
/// When the generator returns an array anyway, the first entry wins.
pub fn parse_draft(raw: &str) -> Result<Itinerary, TripSmithError> {
    let mut drafts = parse_drafts(raw)?;
    Ok(drafts.swap_remove(0))
}
