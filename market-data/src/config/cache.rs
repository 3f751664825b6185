//! Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache sizing and expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    pub ttl_secs: u64,
    /// Maximum number of entries before FIFO eviction kicks in
    pub max_entries: usize,
    /// Period of the background expiry sweep in seconds
    pub sweep_interval_secs: u64,
    /// Clip records from a wider cached range down to the requested range
    pub trim_to_request: bool,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300, // 5 minutes
            max_entries: 100,
            sweep_interval_secs: 60,
            trim_to_request: false,
        }
    }
}
