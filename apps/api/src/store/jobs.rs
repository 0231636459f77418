use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{GenerationJobRow, JobStatus};
use crate::store::StoreError;

/// Persistence contract for generation job rows.
///
/// Jobs are never deleted by this subsystem; cleanup is out of scope.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job with status `pending` and returns the stored row.
    async fn create(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<GenerationJobRow, StoreError>;

    /// Most recently updated job with status `pending` or `in_progress` for
    /// the pair, if any. This is the deduplication lookup: check-then-insert
    /// is not transactional, so a rare duplicate under concurrent submission
    /// is tolerated rather than prevented.
    async fn find_active(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<GenerationJobRow>, StoreError>;

    /// Most recently updated job for the pair regardless of status. The
    /// poller and the enrollment read treat this row as authoritative even
    /// when a race left duplicates behind.
    async fn latest(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError>;

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError>;
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<GenerationJobRow, StoreError> {
        let row = sqlx::query_as::<_, GenerationJobRow>(
            r#"
            INSERT INTO generation_jobs (id, course_id, employee_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, course_id, employee_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_active(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError> {
        let row = sqlx::query_as::<_, GenerationJobRow>(
            r#"
            SELECT id, course_id, employee_id, status, created_at, updated_at
            FROM generation_jobs
            WHERE course_id = $1
              AND employee_id = $2
              AND status IN ('pending', 'in_progress')
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<GenerationJobRow>, StoreError> {
        let row = sqlx::query_as::<_, GenerationJobRow>(
            r#"
            SELECT id, course_id, employee_id, status, created_at, updated_at
            FROM generation_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn latest(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError> {
        let row = sqlx::query_as::<_, GenerationJobRow>(
            r#"
            SELECT id, course_id, employee_id, status, created_at, updated_at
            FROM generation_jobs
            WHERE course_id = $1 AND employee_id = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE generation_jobs
            SET status = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
