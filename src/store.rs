//! Pipeline Store - façade over the three partitions
//!
//! Every operation is exactly one engine transaction. Nothing is cached:
//! each read re-derives its answer from the current snapshot.

use std::path::Path;

use crate::Result;
use crate::model::{PendingPipeline, Pipeline, RunHistory};
use crate::storage::codec;
use crate::storage::{Engine, EngineOptions, Partition, id_key};

/// Persistence for pending pipelines, pipelines and run history.
pub struct PipelineStore {
    engine: Engine,
}

impl PipelineStore {
    /// Wrap an already opened engine
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Open (or create) the database at `path`
    pub fn open(path: &Path, options: EngineOptions) -> Result<Self> {
        Ok(Self::new(Engine::open(path, options)?))
    }

    /// Underlying engine handle
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // ========== Pending Pipeline Operations ==========

    /// Store a pipeline that is about to be compiled.
    ///
    /// Overwrites any entry with the same identifier.
    pub fn put_pending(&self, pending: &PendingPipeline) -> Result<()> {
        tracing::debug!(partition = %Partition::Pending, id = %pending.id, "put pending pipeline");
        self.engine.update(|tx| {
            let buf = codec::encode(pending)?;
            tx.put(Partition::Pending, pending.id.as_bytes(), &buf)
        })
    }

    /// All pending pipelines in identifier order.
    ///
    /// Fails as a whole if any record cannot be decoded.
    pub fn list_pending(&self) -> Result<Vec<PendingPipeline>> {
        tracing::debug!(partition = %Partition::Pending, "list pending pipelines");
        self.engine.view(|tx| {
            let mut pending: Vec<PendingPipeline> = Vec::new();
            tx.for_each(Partition::Pending, |_, value| {
                pending.push(codec::decode(value)?);
                Ok(())
            })?;
            Ok(pending)
        })
    }

    // ========== Pipeline Operations ==========

    /// Persist a pipeline under a freshly assigned id.
    ///
    /// The id passed in is ignored and replaced by the next counter value,
    /// which is also returned. Ids are strictly increasing but not dense.
    pub fn put_pipeline(&self, pipeline: &mut Pipeline) -> Result<u64> {
        tracing::debug!(partition = %Partition::Pipelines, name = %pipeline.name, "put pipeline");
        let id = self.engine.update(|tx| {
            let id = tx.next_sequence(Partition::Pipelines)?;
            let record = Pipeline {
                id,
                ..pipeline.clone()
            };
            let buf = codec::encode(&record)?;
            tx.put(Partition::Pipelines, &id_key(id), &buf)?;
            Ok(id)
        })?;

        pipeline.id = id;
        Ok(id)
    }

    /// Find a pipeline by name with a linear scan.
    ///
    /// Returns the lowest-id match, or `None` if no pipeline has that name.
    pub fn get_pipeline_by_name(&self, name: &str) -> Result<Option<Pipeline>> {
        tracing::debug!(partition = %Partition::Pipelines, name, "get pipeline by name");
        self.engine.view(|tx| {
            let mut found = None;
            tx.for_each(Partition::Pipelines, |_, value| {
                let pipeline: Pipeline = codec::decode(value)?;
                if found.is_none() && pipeline.name == name {
                    found = Some(pipeline);
                }
                Ok(())
            })?;
            Ok(found)
        })
    }

    // ========== Run History Operations ==========

    /// Run history of `pipeline`, or `None` if it never ran
    pub fn get_run_history(&self, pipeline: &Pipeline) -> Result<Option<RunHistory>> {
        self.get_run_history_by_id(pipeline.id)
    }

    pub fn get_run_history_by_id(&self, pipeline_id: u64) -> Result<Option<RunHistory>> {
        tracing::debug!(partition = %Partition::RunHistory, pipeline_id, "get run history");
        self.engine.view(|tx| {
            tx.get(Partition::RunHistory, &id_key(pipeline_id))?
                .map(|value| codec::decode(&value))
                .transpose()
        })
    }

    /// Replace the run history of `history.pipeline_id` wholesale
    pub fn put_run_history(&self, history: &RunHistory) -> Result<()> {
        tracing::debug!(
            partition = %Partition::RunHistory,
            pipeline_id = history.pipeline_id,
            runs = history.runs.len(),
            "put run history"
        );
        self.engine.update(|tx| {
            let buf = codec::encode(history)?;
            tx.put(Partition::RunHistory, &id_key(history.pipeline_id), &buf)
        })
    }

    // ========== Bulk Operations ==========

    /// Entry counts of all partitions from one snapshot
    pub fn stats(&self) -> Result<StoreStats> {
        self.engine.view(|tx| {
            Ok(StoreStats {
                pending: tx.count(Partition::Pending)?,
                pipelines: tx.count(Partition::Pipelines)?,
                histories: tx.count(Partition::RunHistory)?,
                next_pipeline_id: tx.sequence(Partition::Pipelines)? + 1,
            })
        })
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub pending: u64,
    pub pipelines: u64,
    pub histories: u64,
    /// Id the next persisted pipeline will get
    pub next_pipeline_id: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Pending pipelines: {}", self.pending)?;
        writeln!(f, "  Pipelines: {}", self.pipelines)?;
        writeln!(f, "  Run histories: {}", self.histories)?;
        writeln!(f, "  Next pipeline id: {}", self.next_pipeline_id)
    }
}
