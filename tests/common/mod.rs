#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use itembank_proxy::comms::local_api::{create_router, AppState};
use itembank_proxy::config::Config;
use itembank_proxy::security::{Credentials, SignedEnvelope};
use itembank_proxy::transport::{ResponseBody, VendorGateway, VendorResponse};
use itembank_proxy::{ProxyError, ProxyResult};

pub const TEST_SECRET: &str = "s3cr3t-never-echoed";

/// Gateway double: records every call and replays scripted replies, then 200s.
#[derive(Default)]
pub struct RecordingGateway {
    replies: Mutex<VecDeque<ProxyResult<VendorResponse>>>,
    calls: Mutex<Vec<(String, SignedEnvelope)>>,
}

impl RecordingGateway {
    pub fn scripted(replies: Vec<ProxyResult<VendorResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, suffix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.ends_with(suffix))
            .count()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.ends_with(suffix))
            .map(|(_, env)| env.request.clone())
            .collect()
    }
}

#[async_trait]
impl VendorGateway for RecordingGateway {
    async fn send(&self, url: &str, envelope: &SignedEnvelope) -> ProxyResult<VendorResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), envelope.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ok_reply()))
    }
}

pub fn ok_reply() -> VendorResponse {
    VendorResponse {
        status_code: 200,
        body: ResponseBody::Json(json!({"meta": {"status": true}, "data": []})),
    }
}

pub fn upstream(status_code: u16, body: Value) -> ProxyError {
    ProxyError::Upstream {
        status_code,
        body: ResponseBody::Json(body),
    }
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        domain: "test.example.com".to_string(),
        data_api_url: "https://data.test/v1".to_string(),
        max_retries: 1,
        retry_backoff_ms: 1,
        ..Config::default()
    })
}

pub fn test_credentials() -> Arc<Credentials> {
    Arc::new(Credentials::new("consumer-key-1", TEST_SECRET, "test.example.com", "abc").unwrap())
}

pub fn test_router(gateway: Arc<RecordingGateway>) -> Router {
    test_router_with(test_config(), gateway)
}

pub fn test_router_with(config: Arc<Config>, gateway: Arc<RecordingGateway>) -> Router {
    let state = Arc::new(AppState::with_gateway(
        config,
        test_credentials(),
        gateway,
    ));
    create_router(state)
}

pub async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_raw(
    app: &Router,
    path: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", content_type)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn mcq(reference: &str) -> Value {
    json!({
        "reference": reference,
        "type": "mcq",
        "data": {
            "stimulus": "What is the capital of France?",
            "type": "mcq",
            "options": [{"label": "A", "value": "Paris"}],
            "validation": {
                "scoring_type": "exactMatch",
                "valid_response": {"score": 1, "value": ["A"]}
            }
        }
    })
}
