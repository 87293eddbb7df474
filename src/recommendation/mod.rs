//! Carbon-aware start time recommendations
//!
//! The engine slides a task-length window over the forecast, ranks candidate
//! windows by time-weighted average intensity, and explains its choice.

pub mod engine;
pub mod reasoning;
pub mod types;


pub use engine::RecommendationEngine;
pub use types::{Recommendation, RecommendationWindow};
