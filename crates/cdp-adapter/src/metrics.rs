use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, histogram_opts, HistogramVec, IntCounter, IntCounterVec, Registry,
};
use tracing::error;

use crate::error::DriverError;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverMetricsSnapshot {
    pub commands: u64,
    pub command_failures: u64,
    pub sessions_launched: u64,
    pub command_latency_total_us: u64,
}

static COMMANDS: AtomicU64 = AtomicU64::new(0);
static COMMAND_FAILURES: AtomicU64 = AtomicU64::new(0);
static SESSIONS_LAUNCHED: AtomicU64 = AtomicU64::new(0);
static COMMAND_LATENCY_TOTAL_US: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref DRIVER_COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("mailpilot_driver_commands_total", "Total driver commands issued"),
        &["command"]
    )
    .unwrap();
    static ref DRIVER_COMMAND_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "mailpilot_driver_command_failures_total",
            "Total driver command failures"
        ),
        &["command", "kind"]
    )
    .unwrap();
    static ref DRIVER_COMMAND_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "mailpilot_driver_command_duration_seconds",
            "Driver command latency",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 15.0]
        ),
        &["command"]
    )
    .unwrap();
    static ref DRIVER_SESSIONS_TOTAL: IntCounter = IntCounter::new(
        "mailpilot_driver_sessions_total",
        "Browser sessions launched"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register driver metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, DRIVER_COMMANDS_TOTAL.clone());
    register(registry, DRIVER_COMMAND_FAILURES_TOTAL.clone());
    register(registry, DRIVER_COMMAND_DURATION.clone());
    register(registry, DRIVER_SESSIONS_TOTAL.clone());
}

pub fn record_session_launched() {
    SESSIONS_LAUNCHED.fetch_add(1, Ordering::Relaxed);
    DRIVER_SESSIONS_TOTAL.inc();
}

/// Records one finished driver command.
pub fn record_command<T>(command: &str, elapsed: Duration, result: &Result<T, DriverError>) {
    COMMANDS.fetch_add(1, Ordering::Relaxed);
    let micros = elapsed.as_micros().min(u64::MAX as u128) as u64;
    COMMAND_LATENCY_TOTAL_US.fetch_add(micros, Ordering::Relaxed);
    DRIVER_COMMANDS_TOTAL.with_label_values(&[command]).inc();
    DRIVER_COMMAND_DURATION
        .with_label_values(&[command])
        .observe(elapsed.as_secs_f64());
    if let Err(err) = result {
        COMMAND_FAILURES.fetch_add(1, Ordering::Relaxed);
        DRIVER_COMMAND_FAILURES_TOTAL
            .with_label_values(&[command, err.label()])
            .inc();
    }
}

pub fn snapshot() -> DriverMetricsSnapshot {
    DriverMetricsSnapshot {
        commands: COMMANDS.load(Ordering::Relaxed),
        command_failures: COMMAND_FAILURES.load(Ordering::Relaxed),
        sessions_launched: SESSIONS_LAUNCHED.load(Ordering::Relaxed),
        command_latency_total_us: COMMAND_LATENCY_TOTAL_US.load(Ordering::Relaxed),
    }
}
