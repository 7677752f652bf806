use axum::{extract::State, http::Method, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::metrics;

mod providers;
mod tasks;
mod ws;

use super::state::ServeState;

pub fn build_router(state: ServeState) -> Router {
    metrics::register_metrics();
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(tasks::router())
        .merge(providers::router())
        .merge(ws::router())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "MailPilot email automation API",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

async fn health_handler(State(state): State<ServeState>) -> Json<Value> {
    let uptime = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds()
        .max(0);
    Json(json!({
        "status": "ok",
        "uptime_secs": uptime,
        "tasks": state.scheduler().registry().len(),
        "queued": state.scheduler().queued(),
    }))
}
