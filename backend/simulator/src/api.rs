//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

use qf_engine::{simulate, Donation, Donor, Project, SimulationConfig, SimulationResult};

use crate::db;
use crate::errors::{Result, SimulatorError};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

/// Body of `POST /simulate`: the full input tuple for one stateless run.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub projects: Vec<Project>,
    pub donors: Vec<Donor>,
    pub donations: Vec<Donation>,
    pub config: SimulationConfig,
}

#[derive(Serialize)]
pub struct RunsResponse {
    pub count: usize,
    pub runs: Vec<db::RunSummary>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<i64>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /simulate`
///
/// Runs the matching engine over the posted `(projects, donors,
/// donations, config)` tuple and returns the full result. Invalid
/// configuration is a 400; a failure to record the run is logged but
/// does not fail the response.
pub async fn post_simulate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SimulateRequest>,
) -> impl IntoResponse {
    match run_simulation(&state, request).await {
        Ok(result) => (StatusCode::OK, Json(serde_json::json!(result))).into_response(),
        Err(e) => {
            let status = match e {
                SimulatorError::Engine(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(serde_json::json!(ErrorResponse {
                    error: e.to_string()
                })),
            )
                .into_response()
        }
    }
}

async fn run_simulation(state: &ApiState, request: SimulateRequest) -> Result<SimulationResult> {
    let SimulateRequest {
        projects,
        donors,
        donations,
        config,
    } = request;

    let result = simulate(&projects, &donors, &donations, &config)?;

    // Recording the run is best-effort; the caller still gets the result.
    if let Err(e) = db::insert_run(&state.pool, &config, donations.len(), &result).await {
        warn!("Failed to record simulation run: {e}");
    }

    Ok(result)
}

/// `GET /runs`
///
/// Returns recorded run summaries, newest first. `?limit=` caps the
/// count (default 50).
pub async fn get_runs(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RunsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    match db::list_runs(&state.pool, limit).await {
        Ok(runs) => {
            let count = runs.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(RunsResponse { count, runs })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}

/// `GET /runs/:id`
///
/// Returns one recorded run with its stored config and result.
pub async fn get_run(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match db::get_run(&state.pool, id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(serde_json::json!(record))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!(ErrorResponse {
                error: format!("run {id} not found")
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}
