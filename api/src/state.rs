use market_data::config::{CacheConfig, ProducerConfig, ServiceConfig};
use market_data::producer::ProcessInvoker;
use market_data::AcquisitionService;
use shared::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AcquisitionService>,
}

impl AppState {
    /// Build the acquisition service backed by the real producer process.
    pub fn new(config: &Config) -> Self {
        let service = AcquisitionService::new(service_config(config), Arc::new(ProcessInvoker));
        Self::with_service(Arc::new(service))
    }

    pub fn with_service(service: Arc<AcquisitionService>) -> Self {
        AppState { service }
    }
}

pub fn service_config(config: &Config) -> ServiceConfig {
    ServiceConfig {
        cache: CacheConfig {
            ttl_secs: config.cache_ttl_secs,
            max_entries: config.cache_max_entries,
            sweep_interval_secs: config.cache_sweep_interval_secs,
            trim_to_request: config.trim_cached_to_request,
        },
        producer: ProducerConfig {
            program: config.producer_program.clone(),
            leading_args: vec![config.producer_script.clone()],
            working_dir: config.producer_workdir.clone(),
            default_exchanges: config.default_exchanges.clone(),
            timezone: config.market_timezone,
            fetch_all_max_rows: config.fetch_all_max_rows,
            parse_error_ceiling: config.parse_error_ceiling,
            ..ProducerConfig::default()
        },
        first_n_minutes: config.first_n_minutes,
    }
}
