use crate::aggregate::{self, Outcome, Statistic};
use crate::db;
use crate::errors::{Error, Result};
use crate::filter::{FilterParams, ReadingFilter, TypeRequirement};
use crate::metrics::{gather_metrics, HTTP_REQUESTS_TOTAL};
use crate::model::{NewReading, Reading};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

/// Per-request handle to the store, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route(
            "/devices/:device_uuid/readings/",
            get(list_readings).post(create_reading),
        )
        .route("/devices/:device_uuid/readings/max/", get(max))
        .route("/devices/:device_uuid/readings/min/", get(min))
        .route("/devices/:device_uuid/readings/mean/", get(mean))
        .route("/devices/:device_uuid/readings/median/", get(median))
        .route("/devices/:device_uuid/readings/mode/", get(mode))
        .route("/devices/:device_uuid/readings/quartiles/", get(quartiles))
        .route("/devices/summary", get(summary))
        .layer(deadline(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Requests still running after `request_timeout` are answered with 408.
fn deadline(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

async fn health(State(state): State<AppState>) -> Response {
    match db::ping(&state.pool).await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

async fn metrics() -> String {
    gather_metrics()
}

/// Appends one reading. `type` is deliberately not checked against the
/// known sensor types here.
async fn create_reading(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, &'static str)> {
    HTTP_REQUESTS_TOTAL.with_label_values(&["create"]).inc();

    let new: NewReading = serde_json::from_slice(&body)?;
    let now = Utc::now().timestamp();
    db::insert_reading(&state.pool, &device_uuid, &new, now).await?;

    info!(
        "Recorded {} reading {} for device {} at {}",
        new.sensor_type,
        new.value,
        device_uuid,
        new.date_created.unwrap_or(now)
    );
    Ok((StatusCode::CREATED, "success"))
}

async fn list_readings(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Reading>>> {
    HTTP_REQUESTS_TOTAL.with_label_values(&["list"]).inc();

    let filter = ReadingFilter::build(device_uuid, &params, TypeRequirement::Optional)?;
    let readings = db::list_readings(&state.pool, &filter).await?;
    Ok(Json(readings))
}

async fn run_statistic(
    state: &AppState,
    device_uuid: String,
    params: &FilterParams,
    statistic: Statistic,
) -> Result<Outcome> {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[statistic.name()])
        .inc();

    let filter = ReadingFilter::build(device_uuid, params, TypeRequirement::Required)?;
    aggregate::compute(&state.pool, &filter, statistic).await
}

async fn max(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Outcome> {
    run_statistic(&state, device_uuid, &params, Statistic::Max).await
}

async fn min(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Outcome> {
    run_statistic(&state, device_uuid, &params, Statistic::Min).await
}

async fn mean(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Outcome> {
    run_statistic(&state, device_uuid, &params, Statistic::Mean).await
}

async fn median(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Outcome> {
    run_statistic(&state, device_uuid, &params, Statistic::Median).await
}

async fn mode(
    State(state): State<AppState>,
    Path(device_uuid): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<Outcome> {
    run_statistic(&state, device_uuid, &params, Statistic::Mode).await
}

async fn quartiles(Path(_device_uuid): Path<String>) -> Error {
    HTTP_REQUESTS_TOTAL.with_label_values(&["quartiles"]).inc();
    Error::NotImplemented
}

async fn summary() -> Error {
    HTTP_REQUESTS_TOTAL.with_label_values(&["summary"]).inc();
    Error::NotImplemented
}
