//! HTTP API for faucet service

use crate::metrics::MetricsCollector;
use crate::service::FaucetService;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Values injected into the landing page
#[derive(Debug, Clone)]
pub struct PageContext {
    pub amount: String,
    pub node_url: String,
    pub explorer_url: String,
}

/// Shared handler state
pub struct AppState {
    pub service: FaucetService,
    pub page: PageContext,
    pub support_email: String,
    pub metrics: MetricsCollector,
}

/// Routes of the faucet; `assets_dir` is served under `/assets`.
pub fn router(state: Arc<AppState>, assets_dir: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/account/:address", post(top_up_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Top up handler
pub async fn top_up_handler(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    match state.service.top_up(&address).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_reply(&state.support_email),
    }
}

/// Landing page
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.page))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Prometheus exposition
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    state
        .metrics
        .gather()
        .map(|text| ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response())
        .unwrap_or_else(|e| {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

pub fn render_index(page: &PageContext) -> String {
    INDEX_TEMPLATE
        .replace("{{amount}}", &escape_html(&page.amount))
        .replace("{{node}}", &escape_html(&page.node_url))
        .replace("{{explorer_url}}", &escape_html(&page.explorer_url))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
