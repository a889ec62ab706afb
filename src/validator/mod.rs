//! The validation pipeline core
//!
//! [`segment`] prices and resolves one leg at a time while threading a
//! running cursor (current airport, calendar date, remaining budget);
//! [`plan`] folds the segment validator over a whole itinerary and
//! aggregates the outcome into a [`crate::models::PlanValidation`].

pub mod plan;
pub mod segment;

pub use plan::PlanValidator;
pub use segment::{Cursor, SegmentValidator};
