//! Configuration module

pub mod cache;
pub mod producer;

pub use cache::*;
pub use producer::*;

use serde::{Deserialize, Serialize};

/// Top-level configuration for [`crate::service::AcquisitionService`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub producer: ProducerConfig,
    /// Length of the window kept when the first-N-minutes filter is requested
    pub first_n_minutes: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            producer: ProducerConfig::default(),
            first_n_minutes: 15,
        }
    }
}
