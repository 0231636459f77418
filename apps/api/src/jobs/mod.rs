//! Job Submission Gateway — deduplicating entry point for generation jobs.

pub mod handlers;

use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::store::JobStore;

/// Outcome of a submission: the job to watch, and whether an existing live
/// job was reused instead of creating a new row.
#[derive(Debug, Clone, Copy)]
pub struct JobHandle {
    pub job_id: Uuid,
    pub deduplicated: bool,
}

/// Resolves the employee a job is for: an explicit id wins, then the
/// session-derived id, else the request is rejected before any row exists.
pub fn effective_employee_id(
    explicit: Option<Uuid>,
    session: Option<Uuid>,
) -> Result<Uuid, AppError> {
    explicit.or(session).ok_or(AppError::MissingIdentity)
}

/// Submits a generation request for a (course, employee) pair.
///
/// At most one live job per pair, best-effort: the lookup and the insert are
/// separate statements, so two near-simultaneous submissions can both create
/// a row. That rare duplicate is tolerated; readers take the most recently
/// updated row.
pub async fn submit(
    jobs: &dyn JobStore,
    course_id: Uuid,
    explicit_employee: Option<Uuid>,
    session_employee: Option<Uuid>,
) -> Result<JobHandle, AppError> {
    let employee_id = effective_employee_id(explicit_employee, session_employee)?;

    if let Some(existing) = jobs.find_active(course_id, employee_id).await? {
        info!(job_id = %existing.id, %course_id, %employee_id,
            "Reusing existing active generation job");
        return Ok(JobHandle {
            job_id: existing.id,
            deduplicated: true,
        });
    }

    let job = jobs
        .create(course_id, employee_id)
        .await
        .map_err(AppError::JobCreation)?;

    info!(job_id = %job.id, %course_id, %employee_id, "Created generation job");
    Ok(JobHandle {
        job_id: job.id,
        deduplicated: false,
    })
}
