#![allow(dead_code)]

//! Status Poller — the client-side watch loop for a generation job.
//!
//! One cancellable task polls a lightweight status read on a fixed interval
//! until the job completes, the attempt cap runs out, or an absolute deadline
//! expires. The cap and deadline guarantee the UI always reaches a terminal
//! state even when the server-side job silently stalls; timing out only stops
//! the watching, never an in-flight generation run.
//!
//! Consumed by clients of this API; the server never polls itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::job::JobStatus;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const MAX_POLL_ATTEMPTS: u32 = 60;
/// Belt-and-braces absolute cap, independent of the attempt count.
pub const POLL_DEADLINE: Duration = Duration::from_secs(180);

/// Terminal outcome delivered to `on_settled`, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub deadline: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
            deadline: POLL_DEADLINE,
        }
    }
}

#[derive(Debug, Error)]
#[error("status read failed: {0}")]
pub struct StatusReadError(pub String);

/// One lightweight status read. `None` means no job/enrollment is known yet;
/// the poller keeps waiting.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn read(&self) -> Result<Option<JobStatus>, StatusReadError>;
}

/// Handle to the watch task. Dropping it detaches; `cancel` stops watching.
pub struct CancelHandle {
    task: JoinHandle<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Watches a status source until it settles.
///
/// Spawns a single task; `on_settled` is owned by that task, so it can only
/// ever run once — whichever of the attempt cap or the deadline fires first
/// wins. Read errors count as attempts and do not stop the loop.
pub fn watch<F>(source: Arc<dyn StatusSource>, config: WatchConfig, on_settled: F) -> CancelHandle
where
    F: FnOnce(Settled) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let outcome = tokio::time::timeout(
            config.deadline,
            poll_until_complete(source, config.interval, config.max_attempts),
        )
        .await;

        let settled = match outcome {
            Ok(settled) => settled,
            Err(_elapsed) => {
                warn!("Watch deadline expired before the poll loop settled");
                Settled::TimedOut
            }
        };

        on_settled(settled);
    });

    CancelHandle { task }
}

async fn poll_until_complete(
    source: Arc<dyn StatusSource>,
    interval: Duration,
    max_attempts: u32,
) -> Settled {
    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;

        match source.read().await {
            Ok(Some(JobStatus::Completed)) => {
                info!(attempt, "Generation completed");
                return Settled::Completed;
            }
            Ok(status) => {
                debug!(attempt, ?status, "Generation still pending");
            }
            Err(e) => {
                warn!(attempt, "Status read failed: {e}");
            }
        }
    }

    Settled::TimedOut
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP status source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EnrollmentEnvelope {
    enrollment: EnrollmentStatusBody,
}

#[derive(Debug, Deserialize)]
struct EnrollmentStatusBody {
    #[serde(default)]
    personalized_content_generation_status: Option<String>,
}

/// Reads the enrollment status endpoint exposed by this API.
pub struct HttpStatusSource {
    client: Client,
    base_url: String,
    course_id: Uuid,
    employee_id: Uuid,
    bearer: String,
}

impl HttpStatusSource {
    pub fn new(base_url: String, course_id: Uuid, employee_id: Uuid, bearer: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            course_id,
            employee_id,
            bearer,
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn read(&self) -> Result<Option<JobStatus>, StatusReadError> {
        let url = format!(
            "{}/api/v1/courses/{}/enrollment",
            self.base_url.trim_end_matches('/'),
            self.course_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer)
            .query(&[("userId", self.employee_id.to_string())])
            .send()
            .await
            .map_err(|e| StatusReadError(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StatusReadError(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let envelope: EnrollmentEnvelope = response
            .json()
            .await
            .map_err(|e| StatusReadError(e.to_string()))?;

        Ok(envelope
            .enrollment
            .personalized_content_generation_status
            .as_deref()
            .and_then(JobStatus::parse))
    }
}
