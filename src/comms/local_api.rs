use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::security::{Credentials, SignedEnvelope};
use crate::transport::{HttpGateway, ResponseBody, VendorGateway};
use crate::workflows::{BatchReport, FullTestError, Orchestrator};

type SharedState = Arc<AppState>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: Arc<Config>, credentials: Arc<Credentials>) -> ProxyResult<Self> {
        config
            .validate()
            .map_err(|e| ProxyError::Configuration(e.to_string()))?;
        let gateway = HttpGateway::new(config.request_timeout())?;
        Ok(Self::with_gateway(config, credentials, Arc::new(gateway)))
    }

    pub fn with_gateway(
        config: Arc<Config>,
        credentials: Arc<Credentials>,
        gateway: Arc<dyn VendorGateway>,
    ) -> Self {
        let orchestrator = Orchestrator::new(&config, credentials, gateway);
        Self {
            config,
            orchestrator,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AddQuestionsRequest {
    pub questions: Vec<Value>,
    #[serde(default = "default_true")]
    pub create_items: bool,
}

#[derive(Debug, Serialize)]
pub struct AddQuestionsResponse {
    pub success: bool,
    pub message: String,
    pub question_response: BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_results: Option<BatchReport>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct AddItemsResponse {
    pub success: bool,
    pub message: String,
    pub results: BatchReport,
}

#[derive(Debug, Serialize)]
pub struct ItemLookupResponse {
    pub item_reference: String,
    pub status_code: u16,
    pub data: ResponseBody,
}

async fn home() -> impl IntoResponse {
    Json(json!({
        "message": "Item bank proxy",
        "version": crate::VERSION,
        "apis": {
            "items": "/api/items",
            "new_test": "/api/tests/new",
            "get_item": "/api/items/get/{item_reference}",
            "add_questions": "/api/questions/add",
            "add_items": "/api/items/add",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// Signed init for the configured activity template
async fn items_session(
    State(state): State<SharedState>,
) -> Result<Json<SignedEnvelope>, ProxyError> {
    let envelope = state
        .orchestrator
        .items_session()
        .inspect_err(|e| error!("failed to sign items session: {}", e))?;
    Ok(Json(envelope))
}

async fn new_test(
    State(state): State<SharedState>,
) -> Result<Json<SignedEnvelope>, FullTestError> {
    let envelope = state.orchestrator.create_full_test().await?;
    Ok(Json(envelope))
}

// Vendor non-2xx is relayed in the body, not raised
async fn get_item(
    State(state): State<SharedState>,
    Path(item_reference): Path<String>,
) -> Result<Json<ItemLookupResponse>, ProxyError> {
    let (status_code, data) = match state.orchestrator.get_item(&item_reference).await {
        Ok(resp) => (resp.status_code, resp.body),
        Err(ProxyError::Upstream { status_code, body }) => {
            warn!(reference = %item_reference, status_code = %status_code, "item lookup rejected by vendor");
            (status_code, body)
        }
        Err(e) => {
            error!(reference = %item_reference, "item lookup failed: {}", e);
            return Err(e);
        }
    };
    Ok(Json(ItemLookupResponse {
        item_reference,
        status_code,
        data,
    }))
}

fn rejected_body(rejection: JsonRejection) -> ProxyError {
    warn!(status = %rejection.status(), "rejected request body: {}", rejection.body_text());
    ProxyError::Encoding(rejection.body_text())
}

async fn add_questions(
    State(state): State<SharedState>,
    body: Result<Json<AddQuestionsRequest>, JsonRejection>,
) -> Result<Json<AddQuestionsResponse>, ProxyError> {
    let Json(req) = body.map_err(rejected_body)?;
    if req.questions.is_empty() {
        return Err(ProxyError::Encoding("no questions supplied".into()));
    }
    let report = state
        .orchestrator
        .add_questions(req.questions, req.create_items)
        .await;

    let success = report.all_succeeded();
    let mut message = report.questions.message("question");
    if let Some(items) = &report.items {
        message.push_str(&format!("; {}", items.message("item")));
    }
    Ok(Json(AddQuestionsResponse {
        success,
        message,
        question_response: report.questions,
        item_results: report.items,
    }))
}

async fn add_items(
    State(state): State<SharedState>,
    body: Result<Json<AddItemsRequest>, JsonRejection>,
) -> Result<Json<AddItemsResponse>, ProxyError> {
    let Json(req) = body.map_err(rejected_body)?;
    if req.items.is_empty() {
        return Err(ProxyError::Encoding("no items supplied".into()));
    }
    let report = state.orchestrator.add_items(req.items).await;
    Ok(Json(AddItemsResponse {
        success: report.all_succeeded(),
        message: report.message("item"),
        results: report,
    }))
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| {
            if o.contains('*') {
                warn!(origin = %o, "ignoring wildcard CORS origin");
                return None;
            }
            match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers mirror the preflight.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/items", get(items_session))
        .route("/api/tests/new", get(new_test))
        .route("/api/items/get/{item_reference}", get(get_item))
        .route("/api/questions/add", post(add_questions))
        .route("/api/items/add", post(add_items))
        .fallback(fallback)
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub async fn serve(config: Config, credentials: Credentials, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(Arc::new(config), Arc::new(credentials))?);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
