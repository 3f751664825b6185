//! Integration tests for the acquisition service

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use market_data::config::{CacheConfig, ServiceConfig};
use market_data::producer::{InvocationPlan, ProducerInvoker, ProducerOutput};
use market_data::request::HistoricalRequest;
use market_data::{AcquisitionService, FetchError, FetchSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Producer double: returns a fixed outcome after a delay and records every plan it sees
struct ScriptedProducer {
    outcome: Result<ProducerOutput, FetchError>,
    delay: std::time::Duration,
    calls: AtomicUsize,
    plans: Mutex<Vec<InvocationPlan>>,
}

impl ScriptedProducer {
    fn ok(stdout: &str, stderr: &str) -> Arc<Self> {
        Self::with_outcome(Ok(ProducerOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(0),
            success: true,
        }))
    }

    fn with_outcome(outcome: Result<ProducerOutput, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            delay: std::time::Duration::from_millis(150),
            calls: AtomicUsize::new(0),
            plans: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProducerInvoker for ScriptedProducer {
    async fn invoke(&self, plan: &InvocationPlan) -> Result<ProducerOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.plans.lock().unwrap().push(plan.clone());
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 3, 45, 0).unwrap()
}

/// One-minute bars for minutes `0..count` after `t0`
fn minute_bars(count: i64) -> String {
    (0..count)
        .map(|m| {
            format!(
                "DATA:{},100,101,99,100.5,{}\n",
                (t0() + Duration::minutes(m)).to_rfc3339(),
                1000 + m
            )
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_requests_invoke_once() {
    let producer = ScriptedProducer::ok(&minute_bars(30), "Fetching data\nCompleted in 0.05s\n");
    let service = Arc::new(AcquisitionService::new(ServiceConfig::default(), producer.clone()));
    let request = HistoricalRequest::new("SBIN").range(t0(), t0() + Duration::hours(1));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let request = request.clone();
            tokio::spawn(async move { service.fetch(&request).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap());
    }

    assert_eq!(producer.calls(), 1);
    assert!(results.iter().all(|r| r.bars == results[0].bars));
    assert_eq!(results[0].bars.len(), 30);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.source == FetchSource::Producer)
            .count(),
        1
    );
    assert_eq!(service.stats().in_flight, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_the_same_error() {
    let producer = ScriptedProducer::with_outcome(Err(FetchError::Timeout { after_secs: 62 }));
    let service = Arc::new(AcquisitionService::new(ServiceConfig::default(), producer.clone()));
    let request = HistoricalRequest::new("SBIN").range(t0(), t0() + Duration::days(1));

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let service = Arc::clone(&service);
            let request = request.clone();
            tokio::spawn(async move { service.fetch(&request).await })
        })
        .collect();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, FetchError::Timeout { after_secs: 62 });
    }
    assert_eq!(producer.calls(), 1);

    // the failure did not poison the key
    assert!(service.fetch(&request).await.is_err());
    assert_eq!(producer.calls(), 2);
}

#[tokio::test]
async fn test_distinct_keys_run_independently() {
    let producer = ScriptedProducer::ok(&minute_bars(5), "");
    let service = Arc::new(AcquisitionService::new(ServiceConfig::default(), producer.clone()));

    let a = HistoricalRequest::new("SBIN").range(t0(), t0() + Duration::hours(1));
    let b = HistoricalRequest::new("SBIN")
        .interval("5m")
        .range(t0(), t0() + Duration::hours(1));
    let (ra, rb) = tokio::join!(service.fetch(&a), service.fetch(&b));

    assert_eq!(ra.unwrap().source, FetchSource::Producer);
    assert_eq!(rb.unwrap().source, FetchSource::Producer);
    assert_eq!(producer.calls(), 2);
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let producer = ScriptedProducer::ok(&minute_bars(60), "");
    let service = AcquisitionService::new(ServiceConfig::default(), producer.clone());
    let request = HistoricalRequest::new("SBIN").range(t0(), t0() + Duration::hours(1));

    let first = service.fetch(&request).await.unwrap();
    let second = service.fetch(&request).await.unwrap();
    assert_eq!(second.source, FetchSource::Cache);
    assert_eq!(second.bars.len(), first.bars.len());
    assert_eq!(producer.calls(), 1);
}

#[tokio::test]
async fn test_indicator_order_shares_cache_entry() {
    let producer = ScriptedProducer::ok(&minute_bars(10), "");
    let service = AcquisitionService::new(ServiceConfig::default(), producer.clone());

    let a = HistoricalRequest::new("SBIN")
        .range(t0(), t0() + Duration::hours(1))
        .indicators(["rsi", "macd"]);
    let b = HistoricalRequest::new("sbin")
        .range(t0(), t0() + Duration::hours(1))
        .indicators(["MACD", "rsi"]);

    service.fetch(&a).await.unwrap();
    let cached = service.fetch(&b).await.unwrap();
    assert_eq!(cached.source, FetchSource::Cache);
    assert_eq!(producer.calls(), 1);

    let plans = producer.plans.lock().unwrap();
    let indicators = plans[0].args.iter().position(|a| a == "--indicators").unwrap();
    assert_eq!(plans[0].args[indicators + 1], "macd,rsi");
}

#[tokio::test]
async fn test_capacity_eviction_through_service() {
    let producer = ScriptedProducer::ok(&minute_bars(3), "");
    let config = ServiceConfig {
        cache: CacheConfig {
            max_entries: 3,
            ..CacheConfig::default()
        },
        ..ServiceConfig::default()
    };
    let service = AcquisitionService::new(config, producer.clone());

    for symbol in ["A", "B", "C", "D"] {
        service.fetch(&HistoricalRequest::new(symbol)).await.unwrap();
    }

    let stats = service.stats();
    assert_eq!(stats.cache.size, 3);
    assert!(stats.cache.entries.iter().all(|e| !e.key.starts_with("A_")));

    // "A" was evicted, so asking again runs the producer
    service.fetch(&HistoricalRequest::new("A")).await.unwrap();
    assert_eq!(producer.calls(), 5);
}

#[tokio::test]
async fn test_first_fifteen_minutes_end_to_end() {
    let producer = ScriptedProducer::ok(&minute_bars(60), "");
    let service = AcquisitionService::new(ServiceConfig::default(), producer.clone());
    let fetched = service
        .fetch(
            &HistoricalRequest::new("SBIN")
                .range(t0(), t0() + Duration::hours(1))
                .first_n_minutes(true),
        )
        .await
        .unwrap();

    assert_eq!(fetched.bars.len(), 16);
    let plans = producer.plans.lock().unwrap();
    assert!(plans[0].args.contains(&"--first-fifteen-minutes".to_string()));
}

#[tokio::test]
async fn test_clear_during_fetch_does_not_restore_entry() {
    let producer = ScriptedProducer::ok(&minute_bars(5), "");
    let service = AcquisitionService::new(ServiceConfig::default(), producer.clone());
    let request = HistoricalRequest::new("SBIN").range(t0(), t0() + Duration::hours(1));

    let (fetched, _) = tokio::join!(service.fetch(&request), async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        service.clear();
    });

    // the caller still gets its bars, but the cleared key stays empty
    assert_eq!(fetched.unwrap().bars.len(), 5);
    assert_eq!(service.stats().cache.size, 0);

    let again = service.fetch(&request).await.unwrap();
    assert_eq!(again.source, FetchSource::Producer);
    assert_eq!(producer.calls(), 2);
}

fn short_lived_cache() -> ServiceConfig {
    ServiceConfig {
        cache: CacheConfig {
            ttl_secs: 1,
            sweep_interval_secs: 1,
            ..CacheConfig::default()
        },
        ..ServiceConfig::default()
    }
}

#[tokio::test]
async fn test_background_sweep_drops_expired_entries() {
    let producer = ScriptedProducer::ok(&minute_bars(3), "");
    let service = AcquisitionService::new(short_lived_cache(), producer);
    service.fetch(&HistoricalRequest::new("SBIN")).await.unwrap();
    assert_eq!(service.stats().cache.size, 1);

    // no lookups, only the periodic sweep can remove the entry
    tokio::time::sleep(std::time::Duration::from_millis(2600)).await;
    assert_eq!(service.stats().cache.size, 0);
}

#[tokio::test]
async fn test_shutdown_stops_the_sweep() {
    let producer = ScriptedProducer::ok(&minute_bars(3), "");
    let service = AcquisitionService::new(short_lived_cache(), producer);
    service.fetch(&HistoricalRequest::new("SBIN")).await.unwrap();
    service.shutdown();

    tokio::time::sleep(std::time::Duration::from_millis(2600)).await;
    // expired but still stored
    assert_eq!(service.stats().cache.size, 1);
}

#[cfg(unix)]
mod process {
    use super::*;
    use market_data::config::ProducerConfig;
    use market_data::producer::ProcessInvoker;

    fn shell_config(script: &str) -> ServiceConfig {
        ServiceConfig {
            producer: ProducerConfig {
                program: "sh".to_string(),
                leading_args: vec!["-c".to_string(), script.to_string(), "producer".to_string()],
                ..ProducerConfig::default()
            },
            ..ServiceConfig::default()
        }
    }

    fn plan(program: &str, script: &str, deadline_ms: u64) -> InvocationPlan {
        InvocationPlan {
            program: program.to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
            deadline: std::time::Duration::from_millis(deadline_ms),
        }
    }

    #[tokio::test]
    async fn test_real_process_output() {
        let script = "echo 'Fetching data for SBIN' >&2; \
                      echo 'DATA:2024-03-04 09:15:00,100,101,99,100.5,1000'; \
                      echo 'DATA:2024-03-04 09:16:00,100.5,102,100,101,1100'";
        let service = AcquisitionService::new(shell_config(script), Arc::new(ProcessInvoker));
        let fetched = service.fetch(&HistoricalRequest::new("SBIN")).await.unwrap();

        assert_eq!(fetched.bars.len(), 2);
        // naive timestamps are read in market time
        assert_eq!(fetched.bars[0].timestamp, t0());
    }

    #[tokio::test]
    async fn test_deadline_kills_the_process() {
        let started = std::time::Instant::now();
        let err = ProcessInvoker
            .invoke(&plan("sh", "sleep 10", 200))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout { after_secs: 0 });
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_launch_error() {
        let err = ProcessInvoker
            .invoke(&plan("/nonexistent/producer-binary", "true", 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ProcessLaunch(_)));
    }

    #[tokio::test]
    async fn test_error_marker_before_non_zero_exit() {
        let service = AcquisitionService::new(
            shell_config("echo 'ERROR: No company found for code XYZ'; exit 1"),
            Arc::new(ProcessInvoker),
        );
        let err = service.fetch(&HistoricalRequest::new("XYZ")).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::ProducerReported("No company found for code XYZ".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_surfaced() {
        let output = ProcessInvoker
            .invoke(&plan("sh", "echo 'disk quota exceeded' >&2; exit 3", 5000))
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));

        let service = AcquisitionService::new(
            shell_config("echo 'disk quota exceeded' >&2; exit 3"),
            Arc::new(ProcessInvoker),
        );
        let err = service.fetch(&HistoricalRequest::new("SBIN")).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::ProducerFailed {
                code: Some(3),
                detail: "disk quota exceeded".to_string()
            }
        );
    }
}
