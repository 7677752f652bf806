use action_primitives::metrics as step_metrics;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use cdp_adapter::metrics as driver_metrics;
use mailpilot_scheduler::metrics as scheduler_metrics;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        driver_metrics::register_metrics(registry);
        step_metrics::register_metrics(registry);
        scheduler_metrics::register_metrics(registry);
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Prometheus text exposition of every registered collector.
pub fn render() -> Result<String, String> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&global_registry().gather(), &mut buffer)
        .map_err(|err| err.to_string())?;
    String::from_utf8(buffer).map_err(|err| err.to_string())
}

pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => {
            let content_type = HeaderValue::from_str(TextEncoder::new().format_type())
                .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => {
            error!(%err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}
