use std::sync::Arc;

use crate::config::Config;
use crate::generation::worker::Pipeline;
use crate::store::{ContentStore, JobStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub content: Arc<dyn ContentStore>,
    /// Generation worker with its collaborators injected; handlers spawn it
    /// per job rather than holding any global singleton.
    pub pipeline: Pipeline,
    #[allow(dead_code)]
    pub config: Config,
}
