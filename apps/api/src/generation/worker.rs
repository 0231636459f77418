//! Generation Worker — runs one job end to end.
//!
//! Flow: mark in_progress → load course/employee → per-module prompt →
//! model call → section matching → assemble PersonalizedContent →
//! persist + repoint enrollment → mark completed.
//!
//! Modules are generated strictly sequentially: one model call in flight per
//! job bounds API concurrency and keeps partial-failure bookkeeping simple.
//! Model failures degrade to outline-derived content; only a credential
//! failure on the final module (or a prompt-construction error) fails a job.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::generation::fallback::{derive_outlines, fallback_module, mock_content};
use crate::generation::prompts::{build_module_prompt, EDUCATIONAL_SYSTEM};
use crate::generation::sections::match_sections;
use crate::llm_client::TextModel;
use crate::models::content::{
    ContentMetadata, CourseMeta, EmployeeContext, GeneratedModule, ModuleOutline,
    PersonalizedContent,
};
use crate::models::job::{GenerationJobRow, JobStatus};
use crate::store::{ContentStore, JobStore};

/// Terminal failures of a generation run. Everything else degrades.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("model authentication failed")]
    Authentication,

    #[error("prompt construction: {0}")]
    Prompt(#[from] serde_json::Error),
}

/// The generation pipeline with its collaborators injected explicitly.
/// `model` is `None` when no credential is configured; every run then takes
/// the templated-content path.
#[derive(Clone)]
pub struct Pipeline {
    jobs: Arc<dyn JobStore>,
    content: Arc<dyn ContentStore>,
    model: Option<Arc<dyn TextModel>>,
}

impl Pipeline {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        content: Arc<dyn ContentStore>,
        model: Option<Arc<dyn TextModel>>,
    ) -> Self {
        Self {
            jobs,
            content,
            model,
        }
    }

    /// Processes one job to a terminal state. Never returns an error: every
    /// outcome is recorded on the job row or logged. A job whose inputs
    /// cannot be loaded is left untouched for a later trigger; the client
    /// poller's timeout covers that stall.
    pub async fn process(&self, job: GenerationJobRow) {
        info!(job_id = %job.id, course_id = %job.course_id, employee_id = %job.employee_id,
            "Processing generation job");

        if let Err(e) = self.jobs.update_status(job.id, JobStatus::InProgress).await {
            warn!(job_id = %job.id, "Failed to mark job in_progress: {e}");
        }

        let course = match self.content.course(job.course_id).await {
            Ok(Some(course)) => course,
            Ok(None) => {
                warn!(job_id = %job.id, course_id = %job.course_id,
                    "Course not found; leaving job for a later trigger");
                return;
            }
            Err(e) => {
                error!(job_id = %job.id, "Failed to load course: {e}");
                return;
            }
        };

        let ctx: Option<EmployeeContext> = match self.content.employee(job.employee_id).await {
            Ok(row) => row.map(EmployeeContext::from),
            Err(e) => {
                warn!(job_id = %job.id, "Failed to load employee profile, generating generically: {e}");
                None
            }
        };

        let meta = course.meta();
        let outlines = course
            .outlines()
            .unwrap_or_else(|| derive_outlines(&meta));

        match self
            .run(&meta, &outlines, job.employee_id, ctx.as_ref())
            .await
        {
            Ok(content) => self.persist(&job, &content).await,
            Err(e) => {
                warn!(job_id = %job.id, "Generation run failed: {e}");
                if let Err(e) = self.jobs.update_status(job.id, JobStatus::Failed).await {
                    error!(job_id = %job.id, "Failed to mark job failed: {e}");
                }
            }
        }
    }

    /// Generates the full content document without touching the job row.
    pub async fn run(
        &self,
        course: &CourseMeta,
        outlines: &[ModuleOutline],
        employee_id: Uuid,
        ctx: Option<&EmployeeContext>,
    ) -> Result<PersonalizedContent, RunError> {
        let Some(model) = &self.model else {
            info!(course_id = %course.id,
                "No model credential configured; producing templated content");
            return Ok(mock_content(course, employee_id));
        };

        let mut modules = Vec::with_capacity(outlines.len());
        let mut used_cv_data = false;

        for (idx, outline) in outlines.iter().enumerate() {
            let (prompt, used_cv) = build_module_prompt(outline, ctx)?;
            used_cv_data |= used_cv;

            let started = Instant::now();
            match model.complete(EDUCATIONAL_SYSTEM, &prompt).await {
                Ok(reply) => {
                    info!(
                        module = %outline.title,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        prompt_tokens = reply.prompt_tokens,
                        completion_tokens = reply.completion_tokens,
                        "Module generated"
                    );
                    modules.push(GeneratedModule {
                        id: Uuid::new_v4(),
                        title: outline.title.clone(),
                        description: outline.description.clone(),
                        order_index: outline.order_index,
                        sections: match_sections(&reply.text, &outline.sections),
                        resources: vec![],
                    });
                }
                Err(e) if e.is_auth() && idx + 1 == outlines.len() => {
                    // Remaining modules would hit the same credential wall.
                    warn!(module = %outline.title,
                        "Model rejected credentials on the final module: {e}");
                    return Err(RunError::Authentication);
                }
                Err(e) => {
                    warn!(
                        module = %outline.title,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Model call failed, substituting outline fallback: {e}"
                    );
                    modules.push(fallback_module(outline));
                }
            }
        }

        Ok(PersonalizedContent {
            id: Uuid::new_v4(),
            course_id: course.id,
            employee_id,
            title: course.title.clone(),
            description: course.description.clone(),
            level: course.level.clone(),
            modules,
            metadata: ContentMetadata {
                generated_at: Utc::now(),
                generated_for: employee_id,
                used_cv_data,
            },
        })
    }

    /// Final persistence step. Errors here are logged but never unwind the
    /// run: content that was generated wins over a consistent status row,
    /// and the job is still marked completed.
    async fn persist(&self, job: &GenerationJobRow, content: &PersonalizedContent) {
        match self.content.insert(content).await {
            Ok(content_id) => {
                if let Err(e) = self
                    .content
                    .activate(job.course_id, job.employee_id, content_id)
                    .await
                {
                    warn!(job_id = %job.id, "Failed to repoint enrollment: {e}");
                }
            }
            Err(e) => {
                warn!(job_id = %job.id, "Failed to persist generated content: {e}");
            }
        }

        if let Err(e) = self.jobs.update_status(job.id, JobStatus::Completed).await {
            warn!(job_id = %job.id, "Failed to mark job completed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::llm_client::{LlmError, ModelReply};
    use crate::models::content::{CourseRow, EmployeeRow, OutlineSection};
    use crate::store::memory::{MemoryContentStore, MemoryJobStore};

    /// Replies are consumed in order, one per model call.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<ModelReply, LlmError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(ModelReply {
                    text,
                    prompt_tokens: 100,
                    completion_tokens: 400,
                }),
                Some(Err(e)) => Err(e),
                None => panic!("model called more times than scripted"),
            }
        }
    }

    fn auth_error() -> LlmError {
        LlmError::Api {
            status: 401,
            message: "Invalid API Key".to_string(),
        }
    }

    fn server_error() -> LlmError {
        LlmError::Api {
            status: 500,
            message: "upstream unavailable".to_string(),
        }
    }

    fn course_meta() -> CourseMeta {
        CourseMeta {
            id: Uuid::new_v4(),
            title: "Effective Code Review".to_string(),
            description: Some("Giving and receiving review feedback".to_string()),
            level: Some("intermediate".to_string()),
        }
    }

    fn one_section_outline(title: &str) -> ModuleOutline {
        ModuleOutline {
            id: None,
            title: title.to_string(),
            description: None,
            order_index: 0,
            objectives: vec![],
            sections: vec![OutlineSection {
                title: "Overview".to_string(),
                section_type: None,
                duration: None,
            }],
        }
    }

    fn pipeline(
        model: Option<Arc<dyn TextModel>>,
    ) -> (Pipeline, Arc<MemoryJobStore>, Arc<MemoryContentStore>) {
        let jobs = Arc::new(MemoryJobStore::default());
        let content = Arc::new(MemoryContentStore::default());
        (
            Pipeline::new(jobs.clone(), content.clone(), model),
            jobs,
            content,
        )
    }

    #[tokio::test]
    async fn test_end_to_end_matching_headings_become_sections() {
        let outline = ModuleOutline {
            id: None,
            title: "Intro".to_string(),
            description: None,
            order_index: 0,
            objectives: vec![],
            sections: vec![
                OutlineSection {
                    title: "Overview".to_string(),
                    section_type: None,
                    duration: None,
                },
                OutlineSection {
                    title: "Concepts".to_string(),
                    section_type: None,
                    duration: None,
                },
            ],
        };
        let model = ScriptedModel::new(vec![Ok(
            "## Overview\nWhy review matters.\n## Concepts\nMechanics and etiquette.".to_string(),
        )]);
        let (pipeline, _, _) = pipeline(Some(model));

        let content = pipeline
            .run(&course_meta(), &[outline], Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(content.modules.len(), 1);
        let sections = &content.modules[0].sections;
        assert_eq!(sections.len(), 2);
        assert!(sections[0].content.starts_with("## Overview"));
        assert!(sections[1].content.starts_with("## Concepts"));
        assert!(!content.metadata.used_cv_data);
    }

    #[tokio::test]
    async fn test_non_auth_failure_degrades_single_module() {
        let outlines = vec![
            one_section_outline("One"),
            one_section_outline("Two"),
            one_section_outline("Three"),
        ];
        let model = ScriptedModel::new(vec![
            Ok("## Overview\nalpha".to_string()),
            Err(server_error()),
            Ok("## Overview\ngamma".to_string()),
        ]);
        let (pipeline, _, _) = pipeline(Some(model));

        let content = pipeline
            .run(&course_meta(), &outlines, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(content.modules.len(), 3);
        assert!(content.modules[0].sections[0].content.contains("alpha"));
        assert!(content.modules[1].sections[0]
            .content
            .contains("This section introduces"));
        assert!(content.modules[2].sections[0].content.contains("gamma"));
    }

    #[tokio::test]
    async fn test_auth_failure_on_non_last_module_degrades() {
        let outlines = vec![one_section_outline("One"), one_section_outline("Two")];
        let model = ScriptedModel::new(vec![
            Err(auth_error()),
            Ok("## Overview\nsecond".to_string()),
        ]);
        let (pipeline, _, _) = pipeline(Some(model));

        let content = pipeline
            .run(&course_meta(), &outlines, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(content.modules.len(), 2);
        assert!(content.modules[0].sections[0]
            .content
            .contains("This section introduces"));
        assert!(content.modules[1].sections[0].content.contains("second"));
    }

    #[tokio::test]
    async fn test_auth_failure_on_last_module_fails_job_without_content() {
        let course = course_meta();
        let outline_json = serde_json::to_value(vec![one_section_outline("Only")]).unwrap();
        let model = ScriptedModel::new(vec![Err(auth_error())]);

        let (pipeline, jobs, content) = pipeline(Some(model));
        content.courses.lock().unwrap().insert(
            course.id,
            CourseRow {
                id: course.id,
                title: course.title.clone(),
                description: course.description.clone(),
                level: course.level.clone(),
                outline: Some(outline_json),
            },
        );

        let job = jobs.create(course.id, Uuid::new_v4()).await.unwrap();
        pipeline.process(job.clone()).await;

        assert_eq!(jobs.job(job.id).unwrap().status(), Some(JobStatus::Failed));
        assert_eq!(content.inserted_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_model_credential_produces_mock_content() {
        let course = course_meta();
        let (pipeline, jobs, content) = pipeline(None);
        content.courses.lock().unwrap().insert(
            course.id,
            CourseRow {
                id: course.id,
                title: course.title.clone(),
                description: None,
                level: None,
                outline: None,
            },
        );

        let job = jobs.create(course.id, Uuid::new_v4()).await.unwrap();
        pipeline.process(job.clone()).await;

        assert_eq!(
            jobs.job(job.id).unwrap().status(),
            Some(JobStatus::Completed)
        );
        assert_eq!(content.inserted_count(), 1);
        let stored = &content.inserted.lock().unwrap()[0];
        assert_eq!(stored.modules.len(), 3);
        assert!(!stored.metadata.used_cv_data);

        // The enrollment now points at the new content.
        let enrollment = content
            .enrollment(course.id, job.employee_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.personalized_content_id, Some(stored.id));
    }

    #[tokio::test]
    async fn test_persistence_failure_still_completes_job() {
        let course = course_meta();
        let (pipeline, jobs, content) = pipeline(None);
        content.fail_insert.store(true, Ordering::SeqCst);
        content.courses.lock().unwrap().insert(
            course.id,
            CourseRow {
                id: course.id,
                title: course.title.clone(),
                description: None,
                level: None,
                outline: None,
            },
        );

        let job = jobs.create(course.id, Uuid::new_v4()).await.unwrap();
        pipeline.process(job.clone()).await;

        // Content generation succeeded, so the job reports success even
        // though the row never landed.
        assert_eq!(
            jobs.job(job.id).unwrap().status(),
            Some(JobStatus::Completed)
        );
        assert_eq!(content.inserted_count(), 0);
    }

    #[tokio::test]
    async fn test_cv_context_is_recorded_in_metadata() {
        let employee_id = Uuid::new_v4();
        let ctx = EmployeeContext::from(EmployeeRow {
            id: employee_id,
            name: "Dana Reyes".to_string(),
            position: Some("Data Analyst".to_string()),
            department: Some("Analytics".to_string()),
            cv_summary: Some(json!("SQL-heavy reporting background")),
        });
        let model = ScriptedModel::new(vec![Ok("## Overview\npersonal".to_string())]);
        let (pipeline, _, _) = pipeline(Some(model));

        let content = pipeline
            .run(
                &course_meta(),
                &[one_section_outline("Intro")],
                employee_id,
                Some(&ctx),
            )
            .await
            .unwrap();

        assert!(content.metadata.used_cv_data);
        assert_eq!(content.metadata.generated_for, employee_id);
    }
}
