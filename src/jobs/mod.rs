//! Job records, their status state machine, and the store that persists them

pub mod status;
pub mod store;
pub mod types;

#[cfg(test)]
mod store_test;

pub use status::JobStatus;
pub use store::JobStore;
pub use types::{Job, JobDraft, JobId, ResourceUsage, Task};
