//! # Pipestore - embedded persistence for pipelines
//!
//! Stores pipeline definitions and their execution history inside an
//! embedded, transactional key-value engine.
//!
//! Pipestore provides:
//! - Three independent partitions: pending pipelines, compiled pipelines, run history
//! - Store-assigned, strictly increasing pipeline IDs
//! - One engine transaction per operation, all-or-nothing
//! - Schema-tolerant record encoding so new optional fields never break old data

pub mod model;
pub mod storage;
pub mod store;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{
    CreateState, GitRepo, Job, JobStatus, PendingPipeline, Pipeline, PipelineKind, PipelineRun,
    RunHistory, RunStatus,
};
pub use storage::{Engine, EngineOptions, Partition};
pub use store::{PipelineStore, StoreStats};

/// Result type alias for Pipestore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Pipestore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The partition counter could not be advanced.
    #[error("Counter error: {0}")]
    Counter(rusqlite::Error),

    /// Engine I/O, commit or lock failure.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// True for encode/decode failures.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization(_))
    }

    /// True for counter failures; the caller should retry the whole put.
    pub fn is_counter(&self) -> bool {
        matches!(self, Error::Counter(_))
    }

    /// True for engine failures (I/O, commit, busy writer lock).
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}
