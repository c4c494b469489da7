//! Moderation Client HTTP Tests
//!
//! Runs the real HTTP backend against a local axum server that imitates a
//! chat-completions endpoint.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use social_rating_bot::{ModerationClient, Verdict};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the fake endpoint does on each call, by call index
#[derive(Clone, Copy)]
enum Step {
    Reply(&'static str),
    ServerError,
    Garbage,
    Hang,
}

#[derive(Clone)]
struct FakeModel {
    steps: Arc<Vec<Step>>,
    calls: Arc<AtomicUsize>,
    last_body: Arc<parking_lot::Mutex<Option<Value>>>,
}

async fn completions(State(model): State<FakeModel>, Json(body): Json<Value>) -> (StatusCode, String) {
    *model.last_body.lock() = Some(body);
    let index = model.calls.fetch_add(1, Ordering::SeqCst);
    let step = model.steps.get(index).copied().unwrap_or(Step::ServerError);

    match step {
        Step::Reply(content) => (
            StatusCode::OK,
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
                .to_string(),
        ),
        Step::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "model crashed".to_string()),
        Step::Garbage => (StatusCode::OK, "{\"choices\": []}".to_string()),
        Step::Hang => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, String::new())
        }
    }
}

/// Start the fake endpoint, return its URL and handle
async fn start_fake_model(steps: Vec<Step>) -> (String, FakeModel) {
    let model = FakeModel {
        steps: Arc::new(steps),
        calls: Arc::new(AtomicUsize::new(0)),
        last_body: Arc::new(parking_lot::Mutex::new(None)),
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(model.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/chat/completions", addr), model)
}

#[tokio::test]
async fn test_affirmative_reply_is_bad() {
    let (url, model) = start_fake_model(vec![Step::Reply("ДА")]).await;
    let client = ModerationClient::http(&url, Duration::from_secs(2), 2).unwrap();

    assert_eq!(client.classify("угроза").await, Verdict::Bad);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let body = model.last_body.lock().clone().unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Сообщение для проверки: угроза");
    assert_eq!(body["max_tokens"], 5);
}

#[tokio::test]
async fn test_negative_reply_is_ok() {
    let (url, _model) = start_fake_model(vec![Step::Reply("НЕТ")]).await;
    let client = ModerationClient::http(&url, Duration::from_secs(2), 2).unwrap();

    assert_eq!(client.classify("го курить").await, Verdict::Ok);
}

#[tokio::test]
async fn test_server_error_then_success() {
    let (url, model) = start_fake_model(vec![Step::ServerError, Step::Reply("да")]).await;
    let client = ModerationClient::http(&url, Duration::from_secs(2), 2).unwrap();

    assert_eq!(client.classify("текст").await, Verdict::Bad);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_responses_exhaust_retries() {
    let (url, model) = start_fake_model(vec![Step::Garbage, Step::ServerError, Step::Reply("ДА")]).await;
    let client = ModerationClient::http(&url, Duration::from_secs(2), 2).unwrap();

    assert_eq!(client.classify("текст").await, Verdict::Unknown);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let (url, _model) = start_fake_model(vec![Step::Hang, Step::Reply("НЕТ")]).await;
    let client = ModerationClient::http(&url, Duration::from_millis(200), 2).unwrap();

    assert_eq!(client.classify("текст").await, Verdict::Ok);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unknown() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/v1/chat/completions", addr);
    let client = ModerationClient::http(&url, Duration::from_millis(500), 2).unwrap();

    assert_eq!(client.classify("текст").await, Verdict::Unknown);
}
