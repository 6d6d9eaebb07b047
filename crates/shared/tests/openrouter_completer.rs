use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    Completer, CompleterError, OpenRouterCompleter, OpenRouterCompleterConfig,
};
use shared::models::ChatMessage;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_requests: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_requests: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn request_count(&self) -> usize {
        self.seen_requests.lock().await.len()
    }
}

#[tokio::test]
async fn returns_the_assistant_message_and_sends_the_full_history() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("Which ride would you like to book?"),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let completer = OpenRouterCompleter::new(config_for(url, 1, 0)).expect("completer should build");
    let response = completer
        .complete(&ride_conversation())
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response, "Which ride would you like to book?");

    let requests = state.seen_requests.lock().await.clone();
    assert_eq!(requests.len(), 1);
    let messages = requests[0]
        .get("messages")
        .and_then(Value::as_array)
        .expect("request should carry messages");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[2]["content"], "from Indiranagar to Airport");
    assert_eq!(requests[0]["model"], "test-model");

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-openrouter-key".to_string()]);
}

#[tokio::test]
async fn retries_transient_failures_before_succeeding() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        provider_error_reply(StatusCode::BAD_GATEWAY, "upstream_gateway"),
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("Recovered."),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let completer = OpenRouterCompleter::new(config_for(url, 2, 0)).expect("completer should build");
    let response = completer
        .complete(&ride_conversation())
        .await
        .expect("completion should succeed after retries");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response, "Recovered.");
    assert_eq!(state.request_count().await, 3);
}

#[tokio::test]
async fn rate_limit_is_distinguishable_and_never_retried_internally() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let completer = OpenRouterCompleter::new(config_for(url, 3, 0)).expect("completer should build");
    let err = completer
        .complete(&ride_conversation())
        .await
        .expect_err("rate limit should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, CompleterError::RateLimited));
    assert_eq!(state.request_count().await, 1);
}

#[tokio::test]
async fn quota_exhaustion_is_distinguishable_from_rate_limiting() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::PAYMENT_REQUIRED,
        "insufficient_credits",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let completer = OpenRouterCompleter::new(config_for(url, 3, 0)).expect("completer should build");
    let err = completer
        .complete(&ride_conversation())
        .await
        .expect_err("quota exhaustion should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, CompleterError::QuotaExceeded));
    assert_eq!(state.request_count().await, 1);
}

#[tokio::test]
async fn malformed_success_payload_is_an_invalid_payload_error() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({ "choices": [] }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let completer = OpenRouterCompleter::new(config_for(url, 2, 0)).expect("completer should build");
    let err = completer
        .complete(&ride_conversation())
        .await
        .expect_err("empty choices should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, CompleterError::InvalidProviderPayload(_)));
    assert_eq!(state.request_count().await, 1);
}

fn ride_conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are RideAI."),
        ChatMessage::user("need a cab"),
        ChatMessage::user("from Indiranagar to Airport"),
    ]
}

fn config_for(
    chat_completions_url: String,
    max_retries: u32,
    retry_base_backoff_ms: u64,
) -> OpenRouterCompleterConfig {
    OpenRouterCompleterConfig {
        chat_completions_url,
        api_key: "test-openrouter-key".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 5_000,
        max_retries,
        retry_base_backoff_ms,
    }
}

fn success_response_body(content: &str) -> Value {
    json!({
        "id": "req-success",
        "model": "test-model",
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": content
                }
            }
        ]
    })
}

fn provider_error_reply(status: StatusCode, code: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "error": {
                "code": code
            }
        }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/chat/completions", post(test_chat_completions_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/chat/completions"),
        shutdown_tx,
        server_task,
    )
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_requests.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "error": {
                "code": "exhausted_test_replies"
            }
        }),
    });

    (reply.status, Json(reply.body))
}
