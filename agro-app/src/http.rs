//! JSON HTTP surface.
//!
//! | method | path               | body / query            |
//! |--------|--------------------|-------------------------|
//! | POST   | `/v1/simulations`  | [`SimulationInput`]     |
//! | GET    | `/v1/crops`        |                         |
//! | GET    | `/v1/plans`        |                         |
//! | POST   | `/v1/diagnostics`  | [`NewDiagnosticResponse`] |
//! | GET    | `/v1/diagnostics`  | `?limit=`               |
//! | GET    | `/healthz`         |                         |
//!
//! Failures answer `{"ok": false, "error": "..."}`; client mistakes are 400,
//! storage failures 500.

use std::collections::HashMap;
use std::sync::Arc;

use agro_core::calculations::survey::{self, DIAGNOSTIC_KEY_PREFIX};
use agro_core::calculations::{
    ConfigurationError, EngineConfig, MAX_AMOUNT, MAX_AREA_HECTARES, RoiEngine, SimulationSummary,
};
use agro_core::db::diagnostic_limit;
use agro_core::{
    AgroRepository, Baseline, InvestmentMode, NewDiagnosticResponse, RepositoryError,
    SimulationInput, load_reference_data,
};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, info, warn};

/// Shared handler state: the store and the validated engine table.
#[derive(Clone)]
pub struct AppState {
    repo: Arc<dyn AgroRepository>,
    engine: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn AgroRepository>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            repo,
            engine: Arc::new(engine),
        }
    }
}

/// A failed request, rendered as `{"ok": false, "error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"ok": false, "error": self.message})),
        )
            .into_response()
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        error!(error = %err, "repository failure");
        Self::internal(err.to_string())
    }
}

impl From<survey::SurveyError> for ApiError {
    fn from(err: survey::SurveyError) -> Self {
        Self::bad_request(err.to_string())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/v1/simulations", post(simulations_handler))
        .route("/v1/crops", get(crops_handler))
        .route("/v1/plans", get(plans_handler))
        .route(
            "/v1/diagnostics",
            post(save_diagnostic_handler).get(list_diagnostics_handler),
        )
        .layer(from_fn(cors_middleware))
        .with_state(state)
}

/// Answers preflight requests and marks every response readable from any origin.
async fn cors_middleware(
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        let headers = resp.headers_mut();
        headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            "access-control-allow-headers",
            HeaderValue::from_static("content-type"),
        );
        return resp;
    }

    let mut resp = next.run(req).await;
    resp.headers_mut()
        .insert("access-control-allow-origin", HeaderValue::from_static("*"));
    resp
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn simulations_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let input: SimulationInput = parse_body(&body)?;
    validate_simulation_input(&input)?;
    info!(route = "/v1/simulations", crop = %input.crop, area = %input.area_hectares, "request start");

    let reference = load_reference_data(state.repo.as_ref()).await?;
    let engine = RoiEngine::new(&state.engine, &reference)?;
    let result = engine.simulate(&input)?;
    let summary = SimulationSummary::from_result(&result);

    Ok(Json(json!({"ok": true, "result": result, "summary": summary})))
}

async fn crops_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let items = state.repo.list_crop_profiles().await?;
    Ok(Json(json!({"ok": true, "items": items})))
}

async fn plans_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let items = state.repo.list_plans().await?;
    Ok(Json(json!({"ok": true, "items": items})))
}

async fn save_diagnostic_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let submission: NewDiagnosticResponse = parse_body(&body)?;
    let scored = survey::evaluate(&submission).inspect_err(|e| {
        warn!(error = %e, "diagnostic submission rejected");
    })?;

    let user_agent = header_text(&headers, "user-agent").unwrap_or_default();
    let client_ip = header_text(&headers, "x-nf-client-connection-ip")
        .or_else(|| header_text(&headers, "client-ip"))
        .or_else(|| forwarded_for(&headers))
        .unwrap_or_default();

    let record = scored.to_record(&submission, Utc::now(), &user_agent, &client_ip);
    let key = state.repo.save_diagnostic(&record).await?;

    Ok(Json(json!({"ok": true, "key": key, "result": scored})))
}

async fn list_diagnostics_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let requested = params.get("limit").and_then(|v| v.trim().parse::<usize>().ok());
    let items = state
        .repo
        .list_diagnostics(DIAGNOSTIC_KEY_PREFIX, diagnostic_limit(requested))
        .await?;
    Ok(Json(json!({"ok": true, "items": items})))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

/// Rejects inputs the engine would otherwise clamp silently.
fn validate_simulation_input(input: &SimulationInput) -> Result<(), ApiError> {
    if input.area_hectares < Decimal::ZERO {
        return Err(ApiError::bad_request("area_hectares must not be negative"));
    }
    if input.area_hectares > MAX_AREA_HECTARES {
        return Err(ApiError::bad_request(format!(
            "area_hectares must not exceed {MAX_AREA_HECTARES}"
        )));
    }
    match &input.baseline {
        Baseline::ManagedSpend { amount } | Baseline::CostPerHectare { amount } => {
            check_amount("baseline amount", *amount)?;
        }
        Baseline::ReferenceCost => {}
    }
    if let InvestmentMode::Manual { amount } = &input.investment {
        check_amount("investment amount", *amount)?;
    }
    Ok(())
}

fn check_amount(
    field: &str,
    amount: Decimal,
) -> Result<(), ApiError> {
    if amount < Decimal::ZERO {
        return Err(ApiError::bad_request(format!("{field} must not be negative")));
    }
    if amount > MAX_AMOUNT {
        return Err(ApiError::bad_request(format!("{field} must not exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

fn header_text(
    headers: &HeaderMap,
    name: &str,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_text(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
}
