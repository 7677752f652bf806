use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use mailpilot_core_types::TaskId;
use mailpilot_scheduler::{TaskDispatcher, TaskRecord, TaskRequest, TaskStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppResult;
use crate::server::ServeState;

pub(super) fn router() -> Router<ServeState> {
    Router::new()
        .route("/email/send", post(send_handler))
        .route("/email/status/:task_id", get(status_handler))
        .route("/email/tasks", get(list_handler).delete(clear_handler))
        .route("/email/tasks/:task_id/cancel", post(cancel_handler))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    instruction: String,
    #[serde(default = "default_providers")]
    providers: Vec<String>,
    #[serde(default = "default_headless")]
    headless: bool,
}

fn default_providers() -> Vec<String> {
    vec!["gmail".to_string()]
}

fn default_headless() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub(crate) struct SendResponse {
    task_id: TaskId,
    status: TaskStatus,
    results: BTreeMap<String, bool>,
    message: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskList {
    tasks: Vec<TaskRecord>,
    total: usize,
}

async fn send_handler(
    State(state): State<ServeState>,
    Json(request): Json<SendRequest>,
) -> AppResult<Json<SendResponse>> {
    let intent = state.context.parser().parse(&request.instruction)?;
    let record = state
        .scheduler()
        .submit(TaskRequest {
            intent,
            providers: request.providers,
            headless: request.headless,
        })
        .await?;
    info!(task_id = %record.task_id, "email task queued");
    Ok(Json(SendResponse {
        task_id: record.task_id,
        status: record.status,
        results: record.per_provider_results,
        message: "Email task queued successfully".to_string(),
        timestamp: Utc::now(),
    }))
}

async fn status_handler(
    State(state): State<ServeState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskRecord>> {
    let record = state.scheduler().status(&TaskId::from(task_id.as_str())).await?;
    Ok(Json(record))
}

async fn list_handler(State(state): State<ServeState>) -> Json<TaskList> {
    let tasks = state.scheduler().list().await;
    let total = tasks.len();
    Json(TaskList { tasks, total })
}

async fn clear_handler(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let cleared = state.scheduler().clear().await;
    Json(serde_json::json!({
        "message": format!("Cleared {cleared} tasks"),
        "cleared": cleared,
    }))
}

async fn cancel_handler(
    State(state): State<ServeState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let task_id = TaskId::from(task_id.as_str());
    let cancelled = state.scheduler().cancel(&task_id).await?;
    Ok(Json(serde_json::json!({
        "task_id": task_id,
        "cancelled": cancelled,
    })))
}
