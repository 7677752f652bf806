use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cdp_adapter::{ScriptedDriver, ScriptedSessionFactory};
use mailpilot_cli::config::AppConfig;
use mailpilot_cli::server::{build_router, ServeState};
use mailpilot_cli::AppContext;
use serde_json::{json, Value};
use tower::ServiceExt;

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.automation.per_candidate_timeout_ms = 50;
    config.automation.step_timeout_ms = 500;
    config.automation.post_navigate_settle_ms = 0;
    config.automation.post_compose_delay_ms = 0;
    config.automation.inter_field_delay_ms = 0;
    config.automation.provider_settle_ms = 0;
    config.artifacts.screenshot_dir = None;
    config
}

async fn app(start_workers: bool) -> (Router, Arc<ScriptedSessionFactory>) {
    let factory = Arc::new(ScriptedSessionFactory::new(ScriptedDriver::permissive()));
    let context = AppContext::new(fast_config(), factory.clone()).unwrap();
    if start_workers {
        context.scheduler().start().await;
    }
    (build_router(ServeState::new(context)), factory)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn wait_for_terminal(app: &Router, task_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) =
            call(app, Method::GET, &format!("/email/status/{task_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let state = body["status"].as_str().unwrap_or_default().to_string();
        if state == "completed" || state == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {task_id} did not finish");
}

#[tokio::test]
async fn banner_and_health_respond() {
    let (app, _) = app(false).await;
    let (status, body) = call(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn send_queues_a_pending_task() {
    let (app, factory) = app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/email/send",
        Some(json!({"instruction": "send an email to bob@example.com about lunch"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["results"], json!({}));
    assert_eq!(body["message"], "Email task queued successfully");

    let task_id = body["task_id"].as_str().unwrap();
    let (status, record) = call(&app, Method::GET, &format!("/email/status/{task_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "pending");
    assert_eq!(record["providers"], json!(["gmail"]));
    assert_eq!(factory.acquisitions(), 0);
}

#[tokio::test]
async fn submitted_tasks_run_to_completion() {
    let (app, factory) = app(true).await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/email/send",
        Some(json!({
            "instruction": "email to carol@example.com about the launch. saying 'all green'",
            "providers": ["gmail", "outlook"],
        })),
    )
    .await;
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let record = wait_for_terminal(&app, &task_id).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["per_provider_results"], json!({"gmail": true, "outlook": true}));
    assert!(record["completed_at"].is_string());
    assert_eq!(factory.acquisitions(), 1);
    assert_eq!(
        factory.driver().typed_into("input[name='subjectbox']").as_deref(),
        Some("the launch")
    );

    let (_, list) = call(&app, Method::GET, "/email/tasks", None).await;
    assert_eq!(list["total"], 1);

    let (_, cleared) = call(&app, Method::DELETE, "/email/tasks", None).await;
    assert_eq!(cleared["cleared"], 1);
    let (_, cleared) = call(&app, Method::DELETE, "/email/tasks", None).await;
    assert_eq!(cleared["cleared"], 0);
}

#[tokio::test]
async fn unsupported_provider_is_a_client_error() {
    let (app, _) = app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/email/send",
        Some(json!({
            "instruction": "send to dan@example.com",
            "providers": ["gmail", "yahoo"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "unknown_provider");
    assert!(body["error"]["message"].as_str().unwrap().contains("yahoo"));

    let (_, list) = call(&app, Method::GET, "/email/tasks", None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn instruction_without_recipient_is_rejected() {
    let (app, _) = app(false).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/email/send",
        Some(json!({"instruction": "send a note about lunch"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "missing_recipient");
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let (app, _) = app(false).await;
    let (status, body) = call(&app, Method::GET, "/email/status/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "task_not_found");

    let (status, _) = call(&app, Method::POST, "/email/tasks/does-not-exist/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_task_can_be_cancelled() {
    let (app, _) = app(false).await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/email/send",
        Some(json!({"instruction": "send to erin@example.com"})),
    )
    .await;
    let task_id = body["task_id"].as_str().unwrap();

    let (status, body) =
        call(&app, Method::POST, &format!("/email/tasks/{task_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);

    let (_, record) = call(&app, Method::GET, &format!("/email/status/{task_id}"), None).await;
    assert_eq!(record["status"], "failed");
    assert_eq!(record["error"], "task cancelled");
}

#[tokio::test]
async fn providers_are_listed() {
    let (app, _) = app(false).await;
    let (status, body) = call(&app, Method::GET, "/providers", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["providers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|provider| provider["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gmail", "outlook"]);
    assert_eq!(body["providers"][0]["url"], "https://mail.google.com");
    assert_eq!(body["providers"][0]["supported"], true);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let (app, _) = app(false).await;
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("mailpilot_tasks_running"));
}
