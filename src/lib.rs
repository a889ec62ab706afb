//! `TripSmith` - validation and selection of AI-drafted travel itineraries
//!
//! This library takes raw itinerary drafts from a generative model, resolves
//! airports and prices flight segments against live pricing, retries
//! generation on failure up to a bound, and ranks competing candidates to
//! pick the best plan.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod planner;
pub mod providers;
pub mod retry;
pub mod selector;
pub mod validator;
pub mod web;

// Re-export core types for public API
pub use config::TripSmithConfig;
pub use error::TripSmithError;
pub use models::{
    Candidate, DraftPlan, Fare, GenerationConstraints, Itinerary, NearbyAirport, PlanValidation,
    Segment, SegmentValidation, SelectionOutcome, Strategy, TransportMode,
};
pub use planner::TravelPlanner;
pub use providers::{AirportResolver, DraftGenerator, PricingService, ProviderError};
pub use retry::RetryController;
pub use selector::CandidateSelector;
pub use validator::PlanValidator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TripSmithError>;
