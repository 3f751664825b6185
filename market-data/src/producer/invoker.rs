//! Producer process invocation

use crate::config::ProducerConfig;
use crate::data::format_in_zone;
use crate::error::FetchError;
use crate::request::RequestDescriptor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully built producer command line plus the deadline it must meet
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub deadline: Duration,
}

impl InvocationPlan {
    /// Build the command line for `descriptor`.
    ///
    /// Ranged requests pass start/end as wall-clock time in the producer's zone
    /// together with the interval's scroll buffer; unbounded requests ask for
    /// everything up to the row cap.
    pub fn build(descriptor: &RequestDescriptor, config: &ProducerConfig) -> Self {
        let mut args = config.leading_args.clone();

        let exchanges = descriptor
            .exchanges
            .as_ref()
            .unwrap_or(&config.default_exchanges)
            .join(",");

        push_arg(&mut args, "--company", &descriptor.symbol);
        push_arg(&mut args, "--interval", descriptor.interval.as_str());
        push_arg(&mut args, "--exchanges", &exchanges);

        match &descriptor.range {
            Some(range) => {
                push_arg(
                    &mut args,
                    "--start-date",
                    &format_in_zone(range.start, config.timezone),
                );
                push_arg(
                    &mut args,
                    "--end-date",
                    &format_in_zone(range.end, config.timezone),
                );
                args.push("--optimize-range".to_string());
                push_arg(
                    &mut args,
                    "--buffer-minutes",
                    &descriptor.interval.buffer_minutes().to_string(),
                );
                if descriptor.first_n_minutes {
                    args.push("--first-fifteen-minutes".to_string());
                }
            }
            None => {
                args.push("--fetch-all".to_string());
                push_arg(
                    &mut args,
                    "--max-rows",
                    &config.fetch_all_max_rows.to_string(),
                );
            }
        }

        args.push("--enable-cache".to_string());
        args.push("--compress".to_string());
        args.push("--validate-data".to_string());

        if !descriptor.indicators.is_empty() {
            push_arg(&mut args, "--indicators", &descriptor.indicators.join(","));
        }

        Self {
            program: config.program.clone(),
            args,
            working_dir: config.working_dir.clone(),
            deadline: deadline_for(descriptor, config),
        }
    }
}

fn push_arg(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

/// Deadline scaled to the requested span: base plus a per-day allowance, capped.
/// Unbounded fetches always get the cap.
pub fn deadline_for(descriptor: &RequestDescriptor, config: &ProducerConfig) -> Duration {
    let cap = config.max_timeout();
    match &descriptor.range {
        Some(range) => {
            let days = range.span().num_seconds().max(0) as f64 / 86_400.0;
            let secs = config.base_timeout_secs as f64 + days * config.timeout_per_day_secs as f64;
            Duration::from_secs_f64(secs).min(cap)
        }
        None => cap,
    }
}

/// Everything the producer wrote, plus how it exited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Runs a producer invocation. Swappable so tests can return canned output.
#[async_trait]
pub trait ProducerInvoker: Send + Sync {
    /// Run `plan` to completion or until its deadline.
    ///
    /// A non-zero exit is not an error here; callers decide based on the
    /// diagnostics. Launch failures and deadline expiry are.
    async fn invoke(&self, plan: &InvocationPlan) -> Result<ProducerOutput, FetchError>;
}

/// Invoker backed by a real child process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

#[async_trait]
impl ProducerInvoker for ProcessInvoker {
    async fn invoke(&self, plan: &InvocationPlan) -> Result<ProducerOutput, FetchError> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &plan.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Spawning producer: {} {}", plan.program, plan.args.join(" "));
        let child = cmd
            .spawn()
            .map_err(|e| FetchError::ProcessLaunch(format!("{}: {}", plan.program, e)))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(plan.deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProducerOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
                success: output.status.success(),
            }),
            Ok(Err(e)) => Err(FetchError::internal(format!(
                "failed to collect producer output: {}",
                e
            ))),
            Err(_) => {
                warn!(
                    "Producer exceeded its {:?} deadline and was killed",
                    plan.deadline
                );
                Err(FetchError::Timeout {
                    after_secs: plan.deadline.as_secs(),
                })
            }
        }
    }
}
