//! Entity types persisted by the store
//!
//! Three entities live in three partitions:
//! - `PendingPipeline`: submitted for compilation, keyed by a caller-chosen string
//! - `Pipeline`: compiled and runnable, keyed by a store-assigned integer
//! - `RunHistory`: latest run records of one pipeline, keyed by the pipeline id
//!
//! Every non-identity field defaults on decode so records written by an older
//! build (with fewer fields) still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language/toolchain a pipeline is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Go,
    Java,
    Python,
    Cpp,
    Ruby,
    /// Any kind this build does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl PipelineKind {
    /// Get the string representation of the pipeline kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Go => "go",
            PipelineKind::Java => "java",
            PipelineKind::Python => "python",
            PipelineKind::Cpp => "cpp",
            PipelineKind::Ruby => "ruby",
            PipelineKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the compile step for a pending pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateState {
    Running,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CreateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateState::Running => "running",
            CreateState::Success => "success",
            CreateState::Failed => "failed",
            CreateState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CreateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Running,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Scheduled,
    Running,
    Success,
    Failed,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Scheduled => "scheduled",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Unknown => "unknown",
        }
    }

    /// True once the run can no longer change.
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Source repository a pipeline is compiled from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitRepo {
    pub url: String,
    pub username: String,
    pub password: String,
    pub private_key: String,
    pub selected_branch: String,
    pub branches: Vec<String>,
    /// Local checkout directory
    pub local_dest: String,
}

/// A single step of a pipeline's execution graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: u32,
    pub title: String,
    pub description: String,
    /// Lower runs first; equal priorities may run in parallel
    pub priority: i32,
    pub status: JobStatus,
}

impl Job {
    pub fn new(id: u32, title: impl Into<String>, priority: i32) -> Self {
        Self {
            id,
            title: title.into(),
            priority,
            ..Default::default()
        }
    }
}

/// A compiled, runnable pipeline.
///
/// `id` is owned by the store: whatever the caller sets is replaced by the
/// next value of the pipelines counter on persist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub repo: GitRepo,
    #[serde(default, rename = "type")]
    pub kind: PipelineKind,
    /// Path of the compiled executable
    #[serde(default)]
    pub exec_path: String,
    #[serde(default)]
    pub sha256sum: Vec<u8>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub created: DateTime<Utc>,
}

impl Pipeline {
    /// Create an unsaved pipeline (id 0 until persisted)
    pub fn new(name: impl Into<String>, kind: PipelineKind) -> Self {
        Self {
            name: name.into(),
            kind,
            created: Utc::now(),
            ..Default::default()
        }
    }

    pub fn with_repo(mut self, repo: GitRepo) -> Self {
        self.repo = repo;
        self
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }
}

/// A pipeline submitted for compilation, not yet built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPipeline {
    /// Caller-chosen identifier; re-submitting the same one overwrites
    pub id: String,
    /// Source descriptor and compile parameters
    #[serde(default)]
    pub pipeline: Pipeline,
    /// Compile progress, 0-100
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub state: CreateState,
    /// Compiler output or error message
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub created: DateTime<Utc>,
}

impl PendingPipeline {
    pub fn new(id: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            id: id.into(),
            pipeline,
            state: CreateState::Running,
            created: Utc::now(),
            ..Default::default()
        }
    }
}

/// One execution of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineRun {
    pub id: u64,
    pub pipeline_id: u64,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub jobs: Vec<Job>,
}

impl PipelineRun {
    pub fn new(id: u64, pipeline_id: u64) -> Self {
        Self {
            id,
            pipeline_id,
            started: Utc::now(),
            status: RunStatus::Scheduled,
            ..Default::default()
        }
    }
}

/// Run records of a single pipeline, replaced wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHistory {
    pub pipeline_id: u64,
    #[serde(default)]
    pub runs: Vec<PipelineRun>,
}

impl RunHistory {
    pub fn new(pipeline_id: u64) -> Self {
        Self {
            pipeline_id,
            runs: Vec::new(),
        }
    }

    /// Fold a run into the history: replaces the run with the same id or
    /// appends it. The store never merges, so callers do this before saving.
    pub fn record_run(&mut self, run: PipelineRun) {
        match self.runs.iter_mut().find(|r| r.id == run.id) {
            Some(existing) => *existing = run,
            None => self.runs.push(run),
        }
    }

    /// Most recently recorded run
    pub fn latest(&self) -> Option<&PipelineRun> {
        self.runs.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_run_replaces_same_id() {
        let mut history = RunHistory::new(7);
        history.record_run(PipelineRun::new(1, 7));
        history.record_run(PipelineRun::new(2, 7));

        let mut finished = PipelineRun::new(1, 7);
        finished.status = RunStatus::Success;
        history.record_run(finished);

        assert_eq!(history.runs.len(), 2);
        assert_eq!(history.runs[0].status, RunStatus::Success);
        assert_eq!(history.latest().map(|r| r.id), Some(2));
    }

    #[test]
    fn test_unknown_kind_decodes() {
        let p: Pipeline = serde_json::from_str(r#"{"name":"x","type":"haskell"}"#).unwrap();
        assert_eq!(p.kind, PipelineKind::Unknown);
        assert_eq!(p.id, 0);
        assert!(p.jobs.is_empty());
    }

    #[test]
    fn test_run_status_finished() {
        assert!(RunStatus::Cancelled.is_finished());
        assert!(!RunStatus::Running.is_finished());
    }
}
