use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounterVec, Opts, Registry};
use tracing::error;

lazy_static! {
    static ref STEP_OUTCOMES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mailpilot_step_outcomes_total", "Step outcomes by target and result"),
        &["target", "result"]
    )
    .unwrap();
    static ref CANDIDATE_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "mailpilot_candidate_attempts_total",
            "Candidate locator attempts by result"
        ),
        &["result"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register step metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, STEP_OUTCOMES_TOTAL.clone());
    register(registry, CANDIDATE_ATTEMPTS_TOTAL.clone());
}

pub(crate) fn record_step(target: &str, result: &str) {
    STEP_OUTCOMES_TOTAL.with_label_values(&[target, result]).inc();
}

pub(crate) fn record_attempt(matched: bool) {
    let label = if matched { "matched" } else { "missed" };
    CANDIDATE_ATTEMPTS_TOTAL.with_label_values(&[label]).inc();
}
