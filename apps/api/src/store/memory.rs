//! In-memory store implementations for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::content::{CourseRow, EmployeeRow, EnrollmentRow, PersonalizedContent};
use crate::models::job::{GenerationJobRow, JobStatus};
use crate::store::{ContentStore, JobStore, StoreError};

#[derive(Default)]
pub struct MemoryJobStore {
    pub jobs: Mutex<Vec<GenerationJobRow>>,
    pub fail_create: AtomicBool,
}

impl MemoryJobStore {
    pub fn job(&self, id: Uuid) -> Option<GenerationJobRow> {
        self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<GenerationJobRow, StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let now = Utc::now();
        let row = GenerationJobRow {
            id: Uuid::new_v4(),
            course_id,
            employee_id,
            status: JobStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_active(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|j| {
                j.course_id == course_id
                    && j.employee_id == employee_id
                    && j.status().map(|s| s.is_active()).unwrap_or(false)
            })
            .max_by_key(|j| j.updated_at)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<GenerationJobRow>, StoreError> {
        Ok(self.job(id))
    }

    async fn latest(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<GenerationJobRow>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|j| j.course_id == course_id && j.employee_id == employee_id)
            .max_by_key(|j| j.updated_at)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.status = status.as_str().to_string();
            job.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryContentStore {
    pub courses: Mutex<HashMap<Uuid, CourseRow>>,
    pub employees: Mutex<HashMap<Uuid, EmployeeRow>>,
    pub inserted: Mutex<Vec<PersonalizedContent>>,
    pub enrollments: Mutex<HashMap<(Uuid, Uuid), EnrollmentRow>>,
    pub deleted_pairs: Mutex<Vec<(Uuid, Uuid)>>,
    pub fail_insert: AtomicBool,
}

impl MemoryContentStore {
    pub fn with_course(self, course: CourseRow) -> Self {
        self.courses.lock().unwrap().insert(course.id, course);
        self
    }

    pub fn with_employee(self, employee: EmployeeRow) -> Self {
        self.employees.lock().unwrap().insert(employee.id, employee);
        self
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert(&self, content: &PersonalizedContent) -> Result<Uuid, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inserted.lock().unwrap().push(content.clone());
        Ok(content.id)
    }

    async fn activate(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), StoreError> {
        self.enrollments.lock().unwrap().insert(
            (course_id, employee_id),
            EnrollmentRow {
                course_id,
                employee_id,
                personalized_content_id: Some(content_id),
            },
        );
        Ok(())
    }

    async fn delete_for_pair(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.deleted_pairs.lock().unwrap().push((course_id, employee_id));
        let mut inserted = self.inserted.lock().unwrap();
        let before = inserted.len();
        inserted.retain(|c| !(c.course_id == course_id && c.employee_id == employee_id));
        Ok((before - inserted.len()) as u64)
    }

    async fn course(&self, id: Uuid) -> Result<Option<CourseRow>, StoreError> {
        Ok(self.courses.lock().unwrap().get(&id).cloned())
    }

    async fn employee(&self, id: Uuid) -> Result<Option<EmployeeRow>, StoreError> {
        Ok(self.employees.lock().unwrap().get(&id).cloned())
    }

    async fn enrollment(
        &self,
        course_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<EnrollmentRow>, StoreError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .get(&(course_id, employee_id))
            .cloned())
    }
}
