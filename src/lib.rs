//! Carbon-aware job scheduler
//!
//! Recommends when to run a compute job so that it lands in the lowest-carbon
//! window of a grid intensity forecast, estimates the resulting savings, and
//! tracks submitted jobs through their lifecycle.

pub mod carbon_aware;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod insights;
pub mod jobs;
pub mod recommendation;
pub mod rest_api;
pub mod service;
pub mod sustainability;
pub mod telemetry;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use crate::error::{Error, Result};
