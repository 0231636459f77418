//! Axum route handlers for job submission, processing triggers, and the
//! enrollment status read.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{effective_employee_id, submit};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    pub course_id: Uuid,
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub success: bool,
    pub job_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentQuery {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Auth plumbing
// ────────────────────────────────────────────────────────────────────────────

/// The session provider is an external collaborator: the token is opaque here
/// and only its presence is checked.
fn require_bearer(headers: &HeaderMap) -> Result<(), AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.trim().is_empty())
        .map(|_| ())
        .ok_or(AppError::Unauthorized)
}

/// Employee id derived from the session, injected by the upstream auth proxy.
fn session_employee(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("x-employee-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/regenerate-content
///
/// Deduplicating submission: reuses the live job for the pair when one
/// exists, otherwise creates a row and kicks off the worker in-process.
/// A reused job is not re-spawned here — clients re-trigger it through the
/// processing endpoints.
pub async fn handle_regenerate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegenerateRequest>,
) -> Result<Json<RegenerateResponse>, AppError> {
    require_bearer(&headers)?;

    let employee_id = effective_employee_id(request.employee_id, session_employee(&headers))?;

    if request.force_regenerate {
        let removed = state
            .content
            .delete_for_pair(request.course_id, employee_id)
            .await?;
        info!(course_id = %request.course_id, %employee_id, removed,
            "Cleared prior personalized content");
    }

    let handle = submit(
        state.jobs.as_ref(),
        request.course_id,
        Some(employee_id),
        None,
    )
    .await?;

    if !handle.deduplicated {
        spawn_processing(&state, handle.job_id).await?;
    }

    Ok(Json(RegenerateResponse {
        success: true,
        job_id: handle.job_id,
    }))
}

/// POST /api/v1/proxy-process-job | /api/v1/personalize-content/process
pub async fn handle_process_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ProcessBody>,
) -> Result<Json<Value>, AppError> {
    require_bearer(&headers)?;
    process_job(&state, body.job_id).await
}

/// GET /api/v1/proxy-process-job | /api/v1/personalize-content/process
pub async fn handle_process_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProcessQuery>,
) -> Result<Json<Value>, AppError> {
    require_bearer(&headers)?;
    process_job(&state, query.job_id).await
}

/// GET /api/v1/courses/:id/enrollment?userId=...
///
/// Lightweight status read for the client-side poll loop. The most recently
/// updated job for the pair is authoritative, even when a submission race
/// left a duplicate row behind.
pub async fn handle_enrollment_status(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<EnrollmentQuery>,
) -> Result<Json<Value>, AppError> {
    let enrollment = state.content.enrollment(course_id, query.user_id).await?;
    let latest = state.jobs.latest(course_id, query.user_id).await?;

    let status = latest
        .map(|job| job.status)
        .unwrap_or_else(|| "none".to_string());

    Ok(Json(json!({
        "enrollment": {
            "employee_id": query.user_id,
            "personalized_content_id":
                enrollment.and_then(|e| e.personalized_content_id),
            "personalized_content_generation_status": status,
        }
    })))
}

// ────────────────────────────────────────────────────────────────────────────
// Processing kickoff
// ────────────────────────────────────────────────────────────────────────────

/// Spawns the worker for an existing job. Already-completed jobs are left
/// alone so repeated triggers stay idempotent.
async fn process_job(state: &AppState, job_id: Option<Uuid>) -> Result<Json<Value>, AppError> {
    let job_id = job_id.ok_or_else(|| AppError::Validation("job_id is required".to_string()))?;

    let job = state
        .jobs
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    if job.status.as_str() == "completed" {
        info!(%job_id, "Job already completed; nothing to process");
        return Ok(Json(json!({ "success": true })));
    }

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.process(job).await;
    });

    Ok(Json(json!({ "success": true })))
}

async fn spawn_processing(state: &AppState, job_id: Uuid) -> Result<(), AppError> {
    match state.jobs.get(job_id).await? {
        Some(job) => {
            let pipeline = state.pipeline.clone();
            tokio::spawn(async move {
                pipeline.process(job).await;
            });
            Ok(())
        }
        None => {
            // The row was just created; a disappearing job is a storage bug
            // worth surfacing, not silently skipping.
            warn!(%job_id, "Job vanished between creation and kickoff");
            Err(AppError::NotFound(format!("Job {job_id} not found")))
        }
    }
}
