use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use prometheus::{core::Collector, IntCounterVec, IntGauge, Opts, Registry};
use tracing::error;

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

lazy_static! {
    static ref TASKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mailpilot_tasks_total", "Task lifecycle events"),
        &["event"]
    )
    .unwrap();
    static ref PROVIDER_RESULTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "mailpilot_provider_results_total",
            "Final provider run states"
        ),
        &["provider", "state"]
    )
    .unwrap();
    static ref TASKS_RUNNING: IntGauge =
        IntGauge::new("mailpilot_tasks_running", "Tasks currently executing").unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register scheduler metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, TASKS_TOTAL.clone());
    register(registry, PROVIDER_RESULTS_TOTAL.clone());
    register(registry, TASKS_RUNNING.clone());
}

fn increment(counter: &AtomicU64, event: &str) {
    counter.fetch_add(1, Ordering::Relaxed);
    TASKS_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_submitted() {
    increment(&COUNTERS.submitted, "submitted");
}

pub fn record_rejected() {
    increment(&COUNTERS.rejected, "rejected");
}

pub fn record_started() {
    increment(&COUNTERS.started, "started");
    TASKS_RUNNING.inc();
}

pub fn record_completed() {
    increment(&COUNTERS.completed, "completed");
    TASKS_RUNNING.dec();
}

pub fn record_failed(was_running: bool) {
    increment(&COUNTERS.failed, "failed");
    if was_running {
        TASKS_RUNNING.dec();
    }
}

pub fn record_cancelled() {
    increment(&COUNTERS.cancelled, "cancelled");
}

pub fn record_provider_result(provider: &str, state: &str) {
    PROVIDER_RESULTS_TOTAL
        .with_label_values(&[provider, state])
        .inc();
}

#[derive(Clone, Debug, Default)]
pub struct SchedulerMetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

pub fn snapshot() -> SchedulerMetricsSnapshot {
    SchedulerMetricsSnapshot {
        submitted: COUNTERS.submitted.load(Ordering::Relaxed),
        rejected: COUNTERS.rejected.load(Ordering::Relaxed),
        started: COUNTERS.started.load(Ordering::Relaxed),
        completed: COUNTERS.completed.load(Ordering::Relaxed),
        failed: COUNTERS.failed.load(Ordering::Relaxed),
        cancelled: COUNTERS.cancelled.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_feed_the_registry() {
        let registry = Registry::new();
        register_metrics(&registry);
        let before = snapshot();
        record_submitted();
        record_provider_result("gmail", "succeeded");
        assert!(snapshot().submitted > before.submitted);
        assert!(registry
            .gather()
            .iter()
            .any(|family| family.get_name() == "mailpilot_provider_results_total"));
    }
}
