//! Acquisition service: validation, caching, coalescing and the producer pipeline

use crate::cache::{BarCache, CacheStats, Claim, InFlightCoalescer};
use crate::config::ServiceConfig;
use crate::data::{BarSet, OhlcvRecord};
use crate::error::FetchError;
use crate::postprocess::finalize;
use crate::producer::{
    classify, fatal_message, parse_records, InvocationPlan, ParseOptions, ProducerInvoker,
};
use crate::request::{validate, HistoricalRequest, RequestDescriptor};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Where the records of a fetch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Cache,
    /// This caller owned the producer run
    Producer,
    /// This caller joined a producer run owned by someone else
    Coalesced,
}

/// Successful fetch
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bars: BarSet,
    pub source: FetchSource,
}

/// Operational view of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub in_flight: usize,
}

/// Serves historical bars, invoking the producer at most once per distinct
/// request at a time and caching what it returns.
pub struct AcquisitionService {
    cache: Arc<BarCache>,
    flights: Arc<InFlightCoalescer>,
    invoker: Arc<dyn ProducerInvoker>,
    config: Arc<ServiceConfig>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl AcquisitionService {
    /// Create the service and start the periodic cache sweep.
    ///
    /// Outside a Tokio runtime the sweep is not started; expired entries are
    /// then only skipped on lookup.
    pub fn new(config: ServiceConfig, invoker: Arc<dyn ProducerInvoker>) -> Self {
        let cache = Arc::new(BarCache::new(&config.cache));

        let sweeper = match Handle::try_current() {
            Ok(handle) => Some(spawn_sweeper(
                &handle,
                Arc::clone(&cache),
                config.cache.sweep_interval(),
            )),
            Err(_) => {
                warn!("No Tokio runtime available, cache sweep disabled");
                None
            }
        };

        info!(
            "Acquisition service ready (ttl={}s, max_entries={}, producer={})",
            config.cache.ttl_secs, config.cache.max_entries, config.producer.program
        );

        Self {
            cache,
            flights: InFlightCoalescer::new(),
            invoker,
            config: Arc::new(config),
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Fetch bars for `request`.
    ///
    /// Validation errors return before anything else happens. A live cache
    /// entry covering the request is served directly; otherwise the caller
    /// either joins the running fetch for the same key or starts one. The
    /// producer run is spawned, so it finishes (or hits its deadline) even if
    /// this future is dropped.
    pub async fn fetch(&self, request: &HistoricalRequest) -> Result<Fetched, FetchError> {
        let descriptor = validate(request)?;
        let key = descriptor.cache_key(self.config.first_n_minutes);

        if let Some(bars) = self.cached(&key, &descriptor) {
            return Ok(Fetched {
                bars,
                source: FetchSource::Cache,
            });
        }

        match self.flights.claim(&key) {
            Claim::Joined(handle) => {
                info!("Joining in-flight fetch for {}", key);
                let bars = handle.wait().await?;
                Ok(Fetched {
                    bars,
                    source: FetchSource::Coalesced,
                })
            }
            Claim::Owner(ticket, handle) => {
                // Another owner may have stored this key between the lookup and the claim.
                if let Some(bars) = self.cached(&key, &descriptor) {
                    ticket.resolve(Ok(bars.clone()));
                    return Ok(Fetched {
                        bars,
                        source: FetchSource::Cache,
                    });
                }

                let fetch_id = Uuid::new_v4();
                let span = info_span!("fetch", %fetch_id, key = %key);
                let invoker = Arc::clone(&self.invoker);
                let config = Arc::clone(&self.config);
                let cache = Arc::clone(&self.cache);

                tokio::spawn(
                    async move {
                        let result = acquire(invoker.as_ref(), &descriptor, &config)
                            .await
                            .map(Arc::new);

                        match &result {
                            Ok(bars) if !ticket.is_current() => {
                                debug!("Key was cleared during the fetch, not caching {} bars", bars.len());
                            }
                            Ok(bars) => {
                                if cache.put(ticket.key(), Arc::clone(bars), descriptor.range, Utc::now()) {
                                    debug!("Cached {} bars", bars.len());
                                }
                            }
                            Err(e) => error!("Fetch failed: {}", e),
                        }
                        ticket.resolve(result);
                    }
                    .instrument(span),
                );

                let bars = handle.wait().await?;
                Ok(Fetched {
                    bars,
                    source: FetchSource::Producer,
                })
            }
        }
    }

    fn cached(&self, key: &str, descriptor: &RequestDescriptor) -> Option<BarSet> {
        let (bars, _) = self.cache.get(key, descriptor.range.as_ref(), Utc::now())?;
        info!("Cache hit for {} ({} bars)", key, bars.len());
        Some(bars)
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(Utc::now()),
            in_flight: self.flights.len(),
        }
    }

    /// Empty the cache and forget all in-flight fetches
    pub fn clear(&self) {
        let stats = self.stats();
        self.cache.clear();
        self.flights.clear();
        info!(
            "Cleared {} cache entries and {} in-flight fetches",
            stats.cache.size, stats.in_flight
        );
    }

    /// Stop the background sweep
    pub fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Cache sweep stopped");
        }
    }
}

impl Drop for AcquisitionService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_sweeper(handle: &Handle, cache: Arc<BarCache>, period: Duration) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep(Utc::now());
            if removed > 0 {
                info!("Cache sweep removed {} expired entries", removed);
            }
        }
    })
}

/// Run the producer for `descriptor` and turn its output into final records
async fn acquire(
    invoker: &dyn ProducerInvoker,
    descriptor: &RequestDescriptor,
    config: &ServiceConfig,
) -> Result<Vec<OhlcvRecord>, FetchError> {
    let plan = InvocationPlan::build(descriptor, &config.producer);
    info!(
        "Invoking producer for {} {} (deadline {:?})",
        descriptor.symbol, descriptor.interval, plan.deadline
    );
    let started = Instant::now();
    let output = invoker.invoke(&plan).await?;

    let diagnostics = classify(&output.stderr);
    for line in &diagnostics.info {
        debug!("producer: {}", line);
    }
    for line in &diagnostics.warnings {
        warn!("producer: {}", line);
    }
    if let Some(first) = diagnostics.fatal.first() {
        error!(
            "Producer reported {} fatal line(s) for {}",
            diagnostics.fatal.len(),
            descriptor.symbol
        );
        return Err(FetchError::ProducerReported(first.clone()));
    }

    if !output.success {
        // a producer may print its error marker and then exit non-zero
        if let Some(message) = fatal_message(&output.stdout) {
            return Err(FetchError::ProducerReported(message.to_string()));
        }
        let detail = output
            .stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no diagnostic output")
            .to_string();
        return Err(FetchError::ProducerFailed {
            code: output.exit_code,
            detail,
        });
    }

    let options = ParseOptions {
        timezone: config.producer.timezone,
        error_ceiling: config.producer.parse_error_ceiling,
    };
    let parsed = parse_records(&output.stdout, descriptor, &options)?;
    if parsed.rejected > 0 {
        warn!(
            "Skipped {} malformed data lines for {}",
            parsed.rejected, descriptor.symbol
        );
    }

    let finalized = finalize(parsed.records, descriptor, config.first_n_minutes);
    info!(
        "Fetched {} bars for {} {} in {:?}",
        finalized.records.len(),
        descriptor.symbol,
        descriptor.interval,
        started.elapsed()
    );
    Ok(finalized.records)
}
