//! Producer process configuration

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How to launch the external bar producer and how to read what it prints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Executable to run (e.g., "python3")
    pub program: String,
    /// Arguments placed before the request arguments (usually the script path)
    pub leading_args: Vec<String>,
    /// Working directory for the child process
    pub working_dir: Option<PathBuf>,
    /// Exchanges passed when the request has none
    pub default_exchanges: Vec<String>,
    /// Time zone the producer expects start/end in, also used for naive timestamps
    pub timezone: Tz,
    /// Row cap for fetch-all requests
    pub fetch_all_max_rows: usize,
    /// Malformed data lines tolerated before the parse aborts
    pub parse_error_ceiling: usize,
    pub base_timeout_secs: u64,
    pub timeout_per_day_secs: u64,
    pub max_timeout_secs: u64,
}

impl ProducerConfig {
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            leading_args: vec!["fetch_historical_data.py".to_string()],
            working_dir: None,
            default_exchanges: vec!["NSE".to_string(), "BSE".to_string()],
            timezone: chrono_tz::Asia::Kolkata,
            fetch_all_max_rows: 10_000,
            parse_error_ceiling: 10,
            base_timeout_secs: 60,
            timeout_per_day_secs: 2,
            max_timeout_secs: 300,
        }
    }
}
