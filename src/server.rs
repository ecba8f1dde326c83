use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    prober::{self, Diagnoser},
    settings::SettingsLauncher,
    types::ProbeResult,
};

/// Port diagnosed when the request names none.
pub const DEFAULT_PORT: u16 = 443;

/// Shared by every request; carries no per-run state.
#[derive(Clone)]
pub struct AppState {
    diagnoser: Diagnoser,
    launcher: Arc<dyn SettingsLauncher>,
}

impl AppState {
    pub fn new(diagnoser: Diagnoser, launcher: Arc<dyn SettingsLauncher>) -> Self {
        Self { diagnoser, launcher }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    pub target: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Free-form port; wins over `port` when both are given.
    #[serde(default)]
    pub custom_port: Option<u16>,
}

impl DiagnoseRequest {
    pub fn effective_port(&self) -> u16 {
        self.custom_port.or(self.port).unwrap_or(DEFAULT_PORT)
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct MultiResponse {
    pub target: String,
    pub results: Vec<ProbeResult>,
}

#[derive(Debug, Serialize)]
pub struct PortLabel {
    pub port: u16,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CatalogView {
    pub services: Vec<PortLabel>,
    pub risks: Vec<PortLabel>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400: invalid input.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_key, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
        };
        (
            status,
            Json(ApiErrorBody {
                error: error_key.into(),
                message,
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/diagnose", post(post_diagnose))
        .route("/scan", post(post_scan))
        .route("/diagnose-multi", post(post_diagnose_multi))
        .route("/open-network-settings", post(post_open_network_settings))
        .route("/open-port-settings", post(post_open_port_settings))
        .route("/catalog", get(get_catalog))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind, "serving diagnosis API");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Accept a host name or IP literal: no whitespace, no scheme, sane length.
/// A leading `-` would reach `ping` as an option.
pub fn validate_target(raw: &str) -> Result<String, ApiError> {
    let target = raw.trim();
    if target.is_empty() {
        return Err(ApiError::BadRequest("target must not be empty".into()));
    }
    if target.len() > 253 {
        return Err(ApiError::BadRequest("target is too long".into()));
    }
    if target.starts_with('-')
        || target.contains("://")
        || target.chars().any(|c| c.is_whitespace() || c == '/')
    {
        return Err(ApiError::BadRequest(format!("invalid target: {target}")));
    }
    Ok(target.to_string())
}

async fn post_diagnose(
    State(app): State<AppState>,
    Json(req): Json<DiagnoseRequest>,
) -> Result<Json<ProbeResult>, ApiError> {
    let target = validate_target(&req.target)?;
    let port = req.effective_port();
    if port == 0 {
        return Err(ApiError::BadRequest("port must be between 1 and 65535".into()));
    }
    Ok(Json(app.diagnoser.diagnose(&target, port).await))
}

async fn post_scan(
    State(app): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> Result<Json<ProbeResult>, ApiError> {
    let target = validate_target(&req.target)?;
    let report = app.diagnoser.scan(&target).await;
    Ok(Json(ProbeResult::scan_only(&target, report, prober::now_iso_like())))
}

async fn post_diagnose_multi(
    State(app): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> Result<Json<MultiResponse>, ApiError> {
    let target = validate_target(&req.target)?;
    let results = app.diagnoser.diagnose_all(&target).await;
    Ok(Json(MultiResponse { target, results }))
}

async fn post_open_network_settings(State(app): State<AppState>) -> StatusCode {
    app.launcher.open_network_settings();
    StatusCode::NO_CONTENT
}

async fn post_open_port_settings(State(app): State<AppState>) -> StatusCode {
    app.launcher.open_port_settings();
    StatusCode::NO_CONTENT
}

async fn get_catalog(State(app): State<AppState>) -> impl IntoResponse {
    let catalog = app.diagnoser.catalog();
    let to_labels = |table: &'static [(u16, &'static str)]| {
        table
            .iter()
            .map(|&(port, label)| PortLabel { port, label })
            .collect::<Vec<_>>()
    };
    let view = CatalogView {
        services: to_labels(catalog.services()),
        risks: to_labels(catalog.risks()),
    };
    (StatusCode::OK, Json(view))
}
