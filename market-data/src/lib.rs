//! Market-Data: historical OHLCV acquisition and caching
//!
//! Sits between callers asking for price bars and a slow, line-oriented
//! producer process that computes them:
//!
//! - **Requests**: validation, normalization and canonical cache keys
//! - **Producer**: command construction, deadline-bound execution,
//!   diagnostics classification and data-line parsing
//! - **Post-processing**: ordering, de-duplication, gap detection and the
//!   first-N-minutes window
//! - **Cache**: TTL + range-aware storage with FIFO eviction, plus
//!   coalescing of identical in-flight requests
//! - **Service**: the orchestration tying it all together
//!
//! # Example
//!
//! ```no_run
//! use market_data::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), FetchError> {
//!     let service = AcquisitionService::new(ServiceConfig::default(), Arc::new(ProcessInvoker));
//!     let fetched = service
//!         .fetch(&HistoricalRequest::new("RELIANCE").interval("5m"))
//!         .await?;
//!     println!("{} bars from {:?}", fetched.bars.len(), fetched.source);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod postprocess;
pub mod producer;
pub mod request;
pub mod service;

pub use error::FetchError;
pub use service::{AcquisitionService, FetchSource, Fetched, ServiceStats};

// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::postprocess::*;
    pub use crate::producer::*;
    pub use crate::request::*;
    pub use crate::service::*;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FetchError>;
