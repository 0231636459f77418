use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::content::{CourseRow, EmployeeRow, EnrollmentRow, PersonalizedContent};
use crate::store::StoreError;

/// Persistence contract for generated content and its collaborator reads.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Inserts a new content row (active) and returns its id. Prior rows are
    /// left in place; `activate` moves the enrollment pointer.
    async fn insert(&self, content: &PersonalizedContent) -> Result<Uuid, StoreError>;

    /// Deactivates prior content rows for the pair and points the enrollment
    /// at `content_id`. History rows survive with `is_active = false`.
    async fn activate(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Hard-deletes content rows for the pair (forceRegenerate path).
    async fn delete_for_pair(&self, course_id: Uuid, employee_id: Uuid)
        -> Result<u64, StoreError>;

    async fn course(&self, id: Uuid) -> Result<Option<CourseRow>, StoreError>;

    async fn employee(&self, id: Uuid) -> Result<Option<EmployeeRow>, StoreError>;

    async fn enrollment(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<EnrollmentRow>, StoreError>;
}

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn insert(&self, content: &PersonalizedContent) -> Result<Uuid, StoreError> {
        let body = serde_json::to_value(content)?;

        sqlx::query(
            r#"
            INSERT INTO personalized_content (id, course_id, employee_id, content, is_active)
            VALUES ($1, $2, $3, $4, true)
            "#,
        )
        .bind(content.id)
        .bind(content.course_id)
        .bind(content.employee_id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        Ok(content.id)
    }

    async fn activate(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE personalized_content
            SET is_active = (id = $3), updated_at = now()
            WHERE course_id = $1 AND employee_id = $2
            "#,
        )
        .bind(course_id)
        .bind(employee_id)
        .bind(content_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO course_enrollments (course_id, employee_id, personalized_content_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_id, employee_id)
            DO UPDATE SET personalized_content_id = EXCLUDED.personalized_content_id
            "#,
        )
        .bind(course_id)
        .bind(employee_id)
        .bind(content_id)
        .execute(&self.pool)
        .await?;

        info!(%course_id, %employee_id, %content_id, "Enrollment now points at new content");
        Ok(())
    }

    async fn delete_for_pair(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM personalized_content WHERE course_id = $1 AND employee_id = $2",
        )
        .bind(course_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn course(&self, id: Uuid) -> Result<Option<CourseRow>, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, title, description, level, outline FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn employee(&self, id: Uuid) -> Result<Option<EmployeeRow>, StoreError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, position, department, cv_summary FROM employees WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn enrollment(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<EnrollmentRow>, StoreError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT course_id, employee_id, personalized_content_id
            FROM course_enrollments
            WHERE course_id = $1 AND employee_id = $2
            "#,
        )
        .bind(course_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
