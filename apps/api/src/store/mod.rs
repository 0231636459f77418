//! Persistence traits and their Postgres implementations.
//!
//! Handlers and the generation worker only see `JobStore` / `ContentStore`
//! trait objects, so tests can substitute the in-memory stores in `memory`.

pub mod content;
pub mod jobs;
#[cfg(test)]
pub mod memory;

pub use content::{ContentStore, PgContentStore};
pub use jobs::{JobStore, PgJobStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
