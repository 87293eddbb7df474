//! REST API for the scheduler
//!
//! Serves the scheduling contract (`/schedule`, `/jobs`) at the root and
//! under the configured API prefix, plus health and metrics endpoints.

pub mod dto;
mod handlers;
mod server;

pub use server::{build_router, run_server};
