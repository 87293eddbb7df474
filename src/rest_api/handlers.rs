//! HTTP handlers for the REST API

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, instrument, warn};

use crate::jobs::{Job, JobId};
use crate::service::SchedulingService;
use crate::Error;

use super::dto::{
    ClearResponse, ErrorResponse, HealthResponse, ScheduleResponse, StatusRequest, TaskRequest,
    WelcomeResponse,
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::ValidationError(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse::new(self.code(), &self.to_string())),
        )
            .into_response()
    }
}

fn parse_job_id(raw: &str) -> Result<JobId, Error> {
    raw.parse::<u64>()
        .map(JobId)
        .map_err(|_| Error::NotFound(format!("job {} does not exist", raw)))
}

fn rejected(rejection: JsonRejection) -> Error {
    Error::ValidationError(rejection.body_text())
}

#[instrument]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the carbon-aware job scheduler API".to_string(),
    })
}

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Recommend a window for a task and persist it as a pending job
#[instrument(skip(service, payload))]
pub async fn schedule(
    State(service): State<Arc<SchedulingService>>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<ScheduleResponse>, Error> {
    let task = payload
        .map_err(rejected)
        .and_then(|Json(request)| request.into_task())
        .inspect_err(|e| {
            warn!("Rejected schedule request: {}", e);
            #[cfg(feature = "metrics")]
            crate::metrics::record_schedule("rejected");
        })?;

    let outcome = service.schedule(task).await?;
    Ok(Json(outcome.into()))
}

/// List jobs in creation order
#[instrument(skip(service))]
pub async fn list_jobs(State(service): State<Arc<SchedulingService>>) -> Json<Vec<Job>> {
    Json(service.list_jobs().await)
}

/// Cancel a pending job
#[instrument(skip(service), fields(id = %id))]
pub async fn cancel_job(
    State(service): State<Arc<SchedulingService>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, Error> {
    let job = service.cancel_job(parse_job_id(&id)?).await?;
    Ok(Json(job))
}

/// Remove every job
#[instrument(skip(service))]
pub async fn clear_jobs(State(service): State<Arc<SchedulingService>>) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: service.clear_jobs().await,
    })
}

/// Administrative status change
#[instrument(skip(service, payload), fields(id = %id))]
pub async fn update_status(
    State(service): State<Arc<SchedulingService>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Job>, Error> {
    let id = parse_job_id(&id)?;
    let Json(request) = payload.map_err(rejected)?;
    let job = service.advance_job(id, request.parse()?).await?;
    Ok(Json(job))
}

#[cfg(feature = "metrics")]
pub async fn metrics() -> Result<String, Error> {
    crate::metrics::encode()
}
