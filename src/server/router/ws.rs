use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use mailpilot_core_types::TaskId;
use mailpilot_scheduler::{SchedulerError, TaskDispatcher};
use serde_json::json;
use tracing::{debug, warn};

use crate::server::ServeState;

pub(super) fn router() -> Router<ServeState> {
    Router::new().route("/ws/task/:task_id", get(task_updates_handler))
}

async fn task_updates_handler(
    State(state): State<ServeState>,
    Path(task_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let task_id = TaskId::from(task_id.as_str());
    ws.on_upgrade(move |socket| push_task_updates(socket, state, task_id))
}

/// Pushes a record snapshot every interval; closes after a terminal one.
async fn push_task_updates(mut socket: WebSocket, state: ServeState, task_id: TaskId) {
    let interval = Duration::from_millis(state.context.config().server.ws_push_interval_ms.max(50));
    loop {
        let payload = match state.scheduler().status(&task_id).await {
            Ok(record) => {
                let terminal = record.status.is_terminal();
                match serde_json::to_string(&json!({
                    "task": record,
                    "timestamp": Utc::now(),
                })) {
                    Ok(text) => (text, terminal),
                    Err(err) => {
                        warn!(task_id = %task_id, ?err, "failed to encode task snapshot");
                        break;
                    }
                }
            }
            Err(SchedulerError::NotFound(_)) => {
                let text = json!({
                    "error": "task_not_found",
                    "task_id": task_id,
                    "timestamp": Utc::now(),
                })
                .to_string();
                (text, true)
            }
            Err(err) => {
                warn!(task_id = %task_id, %err, "task lookup failed");
                break;
            }
        };

        let (text, done) = payload;
        if socket.send(Message::Text(text)).await.is_err() {
            debug!(task_id = %task_id, "websocket client went away");
            return;
        }
        if done {
            break;
        }
        tokio::time::sleep(interval).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}
