#![allow(dead_code)]

use actix_web::{App, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted upstream answer.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
    pub delay_ms: u64,
}

impl MockResponse {
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        MockResponse {
            status,
            body,
            delay_ms: 0,
        }
    }

    pub fn delayed(body: Value, delay_ms: u64) -> Self {
        MockResponse {
            status: 200,
            body,
            delay_ms,
        }
    }
}

/// Scripted behavior for the mock: responses keyed by the `model` field
/// of the incoming payload, with a fallback for everything else.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub per_model: HashMap<String, MockResponse>,
    pub default: MockResponse,
}

impl MockBehavior {
    pub fn always(response: MockResponse) -> Self {
        MockBehavior {
            per_model: HashMap::new(),
            default: response,
        }
    }

    pub fn model(mut self, model: &str, response: MockResponse) -> Self {
        self.per_model.insert(model.to_string(), response);
        self
    }
}

/// A mock Groq endpoint bound to an ephemeral port.
pub struct MockGroq {
    /// Full URL of the mocked chat-completion endpoint.
    pub url: String,
    /// Total requests received.
    pub hits: Arc<AtomicUsize>,
    /// Every payload received, in order.
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl MockGroq {
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

struct MockState {
    behavior: MockBehavior,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn completions(body: web::Json<Value>, state: web::Data<MockState>) -> HttpResponse {
    let payload = body.into_inner();
    state.hits.fetch_add(1, Ordering::SeqCst);

    let model = payload.get("model").and_then(Value::as_str).unwrap_or("");
    let response = state
        .behavior
        .per_model
        .get(model)
        .unwrap_or(&state.behavior.default)
        .clone();
    state.requests.lock().unwrap().push(payload);

    if response.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
    }
    HttpResponse::build(actix_web::http::StatusCode::from_u16(response.status).unwrap())
        .json(response.body)
}

/// Starts the mock on 127.0.0.1:0 inside the current actix system.
pub async fn spawn_mock_groq(behavior: MockBehavior) -> MockGroq {
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = web::Data::new(MockState {
        behavior,
        hits: hits.clone(),
        requests: requests.clone(),
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/v1/chat/completions", web::post().to(completions))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    MockGroq {
        url: format!("http://{}/v1/chat/completions", addr),
        hits,
        requests,
    }
}

/// A well-formed upstream completion carrying `content`.
pub fn completion_body(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}
