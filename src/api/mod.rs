//! HTTP API surface
//!
//! JSON only; request bodies are camelCase (the client-facing convention),
//! validation payloads come back snake_case as produced by the pipeline.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::TripSmithError;
use crate::models::{
    DraftPlan, GenerationConstraints, Itinerary, NearbyAirport, PlanValidation, SelectionOutcome,
    Strategy,
};
use crate::planner::TravelPlanner;
use crate::providers::AirportResolver;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TravelPlanner>,
    pub airports: Arc<dyn AirportResolver>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/generate_travel_plans/{strategy}",
            post(generate_travel_plans),
        )
        .route("/validate_travel_plan", post(validate_travel_plan))
        .route("/nearest_airport", get(nearest_airport))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub starting_point: String,
    #[serde(default)]
    pub starting_airport: String,
    pub budget: f64,
    pub travel_length: u32,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub visited_places: Vec<String>,
    /// How many competing drafts to request per round; 1 means the plain
    /// retry loop
    #[serde(default = "default_candidates")]
    pub candidates: usize,
}

fn default_candidates() -> usize {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub selected_plan: DraftPlan,
    pub validation: Option<PlanValidation>,
    pub all_candidates: Vec<Itinerary>,
    pub validations: Vec<PlanValidation>,
    pub attempts: u32,
}

impl From<SelectionOutcome> for GenerationResponse {
    fn from(outcome: SelectionOutcome) -> Self {
        let (all_candidates, validations) = outcome
            .candidates
            .into_iter()
            .map(|c| (c.itinerary, c.validation))
            .unzip();
        Self {
            selected_plan: outcome.selected_plan,
            validation: outcome.validation,
            all_candidates,
            validations,
            attempts: outcome.attempts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub plan: DraftPlan,
    #[serde(default)]
    pub starting_airport: String,
    pub budget: f64,
    #[serde(default)]
    pub trip_length_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct NearestAirportQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn into_error(error: TripSmithError) -> ApiError {
    let status = match &error {
        TripSmithError::Structural { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TripSmithError::Generator { .. } | TripSmithError::Transport { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(%error, "request failed");
    (
        status,
        Json(ErrorBody {
            detail: error.user_message(),
        }),
    )
}

async fn generate_travel_plans(
    State(state): State<AppState>,
    Path(strategy): Path<Strategy>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let constraints = GenerationConstraints {
        strategy,
        starting_point: request.starting_point,
        starting_airport: request.starting_airport,
        budget: request.budget,
        travel_length: request.travel_length,
        preferences: request.preferences,
        visited_places: request.visited_places,
        candidates: request.candidates.max(1),
    };

    let outcome = state
        .planner
        .generate_and_validate(&constraints, None)
        .await
        .map_err(into_error)?;

    Ok(Json(outcome.into()))
}

async fn validate_travel_plan(
    State(state): State<AppState>,
    Json(request): Json<ValidationRequest>,
) -> Result<Json<PlanValidation>, ApiError> {
    let validation = state
        .planner
        .validate(
            &request.plan,
            &request.starting_airport,
            request.budget,
            request.trip_length_days,
        )
        .await
        .map_err(into_error)?;

    Ok(Json(validation))
}

async fn nearest_airport(
    State(state): State<AppState>,
    Query(query): Query<NearestAirportQuery>,
) -> Result<Json<NearbyAirport>, ApiError> {
    match state.airports.nearest_airport(query.lat, query.lon).await {
        Ok(Some(airport)) => Ok(Json(airport)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                detail: "No airport found near the given coordinates".to_string(),
            }),
        )),
        Err(e) if e.is_transport() => {
            Err(into_error(TripSmithError::transport(e.to_string())))
        }
        Err(e) => Err(into_error(TripSmithError::general(e.to_string()))),
    }
}
