use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use cobra_core::{
    ClearScope, DispatchContext, Node, NodeFilter, NodeRegistration, Phase, TaskFilter, TaskRecord,
};
use cobra_ledger::LedgerError;
use cobra_scheduler::{DispatchError, DispatchOutcome, DispatchRequest, Scheduler, SchedulerMetrics};

use crate::state::AppState;

// ── Errors ────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Dispatch(DispatchError),
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(e) => match e {
                DispatchError::NoEligibleNode { .. } => StatusCode::CONFLICT,
                DispatchError::UnknownTaskType(_) | DispatchError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                DispatchError::Storage(LedgerError::Conflict(_)) => StatusCode::CONFLICT,
                DispatchError::Storage(_)
                | DispatchError::Serialization(_)
                | DispatchError::LockPoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError::Dispatch(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody { error: msg, kind: "bad_request" },
            ApiError::Dispatch(e) => ErrorBody { error: e.to_string(), kind: e.kind() },
        };
        (status, Json(body)).into_response()
    }
}

/// Run a scheduler call on the blocking pool. Dispatch sleeps for the
/// simulated latency and the file ledger does synchronous I/O.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Scheduler) -> Result<T, DispatchError> + Send + 'static,
{
    let scheduler = Arc::clone(&state.scheduler);
    tokio::task::spawn_blocking(move || f(&scheduler))
        .await
        .map_err(|e| {
            ApiError::Dispatch(DispatchError::Storage(LedgerError::Backend(format!(
                "blocking task failed: {}",
                e
            ))))
        })?
        .map_err(ApiError::from)
}

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ledger: String,
    pub default_policy: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ledger: state.config.ledger.backend.to_string(),
        default_policy: state.scheduler.config().default_policy.to_string(),
    })
}

// ── Nodes & tasks ─────────────────────────────────────────────────

pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<NodeFilter>, QueryRejection>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let Query(filter) = filter?;
    let nodes = blocking(&state, move |s| s.find_nodes(&filter)).await?;
    Ok(Json(nodes))
}

pub async fn register_node(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NodeRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let Json(registration) = payload?;
    let node = blocking(&state, move |s| s.register_node(registration)).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let Query(filter) = filter?;
    let tasks = blocking(&state, move |s| s.find_tasks(&filter)).await?;
    Ok(Json(tasks))
}

// ── Dispatch ──────────────────────────────────────────────────────

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<DispatchOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = blocking(&state, move |s| s.dispatch(request)).await?;
    Ok(Json(outcome))
}

// ── Ledger admin ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ClearRequest {
    pub scope: String,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub scope: ClearScope,
    pub removed: usize,
}

pub async fn clear_ledger(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClearRequest>, JsonRejection>,
) -> Result<Json<ClearResponse>, ApiError> {
    let Json(req) = payload?;
    let scope: ClearScope = req
        .scope
        .parse()
        .map_err(|e: cobra_core::CobraError| ApiError::BadRequest(e.to_string()))?;
    let removed = blocking(&state, move |s| s.clear(scope)).await?;
    info!("Cleared {} record(s) via API (scope {:?})", removed, scope);
    Ok(Json(ClearResponse { scope, removed }))
}

// ── Scheduler introspection ───────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStateResponse {
    pub phase: Phase,
    #[serde(flatten)]
    pub context: DispatchContext,
}

pub async fn scheduler_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchedulerStateResponse>, ApiError> {
    let context = blocking(&state, |s| s.dispatch_context()).await?;
    Ok(Json(SchedulerStateResponse {
        phase: context.phase(),
        context,
    }))
}

pub async fn scheduler_metrics(State(state): State<Arc<AppState>>) -> Json<SchedulerMetrics> {
    Json(state.scheduler.metrics())
}

/// Effective configuration with secrets masked.
pub async fn config_summary(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config.redacted_summary())
}
