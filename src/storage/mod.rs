//! Storage Layer - embedded transactional key-value engine
//!
//! The engine is SQLite in WAL mode with one table per partition:
//! - pending_pipelines(key = identifier bytes, value = record)
//! - pipelines(key = big-endian u64 id, value = record)
//! - run_history(key = big-endian u64 pipeline id, value = record)
//! - partition_sequences(partition, value) backing the per-partition counters

pub mod codec;
pub mod engine;
pub mod schema;

pub use engine::{Engine, EngineOptions, Partition, ReadTx, SyncMode, WriteTx, id_key};
