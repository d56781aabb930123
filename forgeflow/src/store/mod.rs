//! Persistence seam for pipeline documents and execution records.
//!
//! The core only needs opaque documents keyed by id: definitions and
//! graphs are read, execution records are written. The real datastore
//! lives outside this crate; [`MemoryStore`] backs tests and examples.

use crate::compiler::PipelineDefinition;
use crate::engine::ExecutionRecord;
use crate::errors::ForgeflowError;
use crate::graph::ExecutionGraph;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use uuid::Uuid;

/// Storage collaborator for pipeline definitions, execution graphs, and
/// execution records.
#[async_trait]
pub trait PipelineStore: Send + Sync + Debug {
    /// Loads the block-based definition of a pipeline.
    async fn load_definition(&self, pipeline_id: &str)
        -> Result<PipelineDefinition, ForgeflowError>;

    /// Loads the node/edge execution graph of a pipeline.
    async fn load_graph(&self, pipeline_id: &str) -> Result<ExecutionGraph, ForgeflowError>;

    /// Upserts an execution record.
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), ForgeflowError>;

    /// Reads an execution record back.
    async fn load_execution(&self, execution_id: Uuid)
        -> Result<ExecutionRecord, ForgeflowError>;
}

/// In-memory [`PipelineStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: RwLock<HashMap<String, PipelineDefinition>>,
    graphs: RwLock<HashMap<String, ExecutionGraph>>,
    executions: RwLock<HashMap<Uuid, ExecutionRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a definition under a pipeline id.
    pub fn put_definition(&self, pipeline_id: impl Into<String>, definition: PipelineDefinition) {
        self.definitions.write().insert(pipeline_id.into(), definition);
    }

    /// Stores a graph under a pipeline id.
    pub fn put_graph(&self, pipeline_id: impl Into<String>, graph: ExecutionGraph) {
        self.graphs.write().insert(pipeline_id.into(), graph);
    }

    /// Number of execution records saved so far.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.read().len()
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn load_definition(
        &self,
        pipeline_id: &str,
    ) -> Result<PipelineDefinition, ForgeflowError> {
        self.definitions
            .read()
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| ForgeflowError::NotFound(format!("pipeline definition '{pipeline_id}'")))
    }

    async fn load_graph(&self, pipeline_id: &str) -> Result<ExecutionGraph, ForgeflowError> {
        self.graphs
            .read()
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| ForgeflowError::NotFound(format!("execution graph '{pipeline_id}'")))
    }

    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), ForgeflowError> {
        self.executions
            .write()
            .insert(record.execution_id, record.clone());
        Ok(())
    }

    async fn load_execution(
        &self,
        execution_id: Uuid,
    ) -> Result<ExecutionRecord, ForgeflowError> {
        self.executions
            .read()
            .get(&execution_id)
            .cloned()
            .ok_or_else(|| ForgeflowError::NotFound(format!("execution '{execution_id}'")))
    }
}
