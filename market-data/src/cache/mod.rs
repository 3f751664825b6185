//! Cache module
//!
//! Time-bounded, range-aware storage of finished fetches and the table of
//! fetches still running.

pub mod inflight;
pub mod store;

pub use inflight::*;
pub use store::*;
