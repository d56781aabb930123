//! Sequential pipeline execution engine.
//!
//! The engine loads a pipeline's execution graph, schedules its nodes with
//! [`crate::graph::execution_order`], and dispatches them one at a time,
//! threading a single [`ExecutionContext`] through the run. The first node
//! error aborts the run; later nodes stay pending.

mod context;
mod dispatch;
mod record;

pub use context::ExecutionContext;
pub use dispatch::{sanitize, NodeDispatcher, DEFAULT_NODE_RUNTIME};
pub use record::{ExecutionRecord, NodeRecord, NodeStatus, RunStatus};

use crate::errors::ForgeflowError;
use crate::graph::execution_order;
use crate::store::PipelineStore;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one engine run.
///
/// Node-level failures land here with `success == false`; the surrounding
/// infrastructure failing (missing documents, cyclic graph, storage) is an
/// error from [`ExecutionEngine::run`] instead.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Whether every node completed.
    pub success: bool,
    /// Id of the persisted execution record.
    pub execution_id: Uuid,
    /// The final record, with per-node statuses in scheduled order.
    pub record: ExecutionRecord,
    /// The context as it stood when the run ended.
    pub context: ExecutionContext,
    /// The error that aborted the run, if one did.
    pub error: Option<String>,
}

/// Walks execution graphs node by node.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    store: Arc<dyn PipelineStore>,
    dispatcher: NodeDispatcher,
}

impl ExecutionEngine {
    /// Creates an engine over the given store and dispatcher.
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>, dispatcher: NodeDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Runs the pipeline's graph to completion or first failure.
    ///
    /// Returns `Err` only when the run could not proceed at all: unknown
    /// pipeline, cyclic graph, or a storage failure. A node failing
    /// mid-run is reported through the returned [`RunOutcome`].
    pub async fn run(
        &self,
        pipeline_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<RunOutcome, ForgeflowError> {
        let graph = self.store.load_graph(pipeline_id).await?;
        let ordered = execution_order(&graph)?;

        let mut record =
            ExecutionRecord::new(pipeline_id, ordered.iter().map(|node| node.id.clone()));
        let execution_id = record.execution_id;
        self.store.save_execution(&record).await?;

        tracing::info!(
            pipeline = pipeline_id,
            execution = %execution_id,
            nodes = ordered.len(),
            "starting pipeline execution"
        );

        let mut context = ExecutionContext::new();
        let mut failure: Option<String> = None;

        for node in ordered {
            record.set_node_status(&node.id, NodeStatus::Running);
            self.store.save_execution(&record).await?;

            match self
                .dispatcher
                .dispatch(node, user_id, project_id, &mut context)
                .await
            {
                Ok(()) => {
                    record.set_node_status(&node.id, NodeStatus::Success);
                    self.store.save_execution(&record).await?;
                }
                Err(error) => {
                    tracing::error!(
                        pipeline = pipeline_id,
                        execution = %execution_id,
                        node = %node.id,
                        error = %error,
                        "node failed; aborting run"
                    );
                    record.set_node_status(&node.id, NodeStatus::Failed);
                    failure = Some(error.to_string());
                    break;
                }
            }
        }

        let status = if failure.is_none() {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        record.finish(status);
        self.store.save_execution(&record).await?;

        tracing::info!(
            pipeline = pipeline_id,
            execution = %execution_id,
            status = %status,
            "pipeline execution finished"
        );

        Ok(RunOutcome {
            success: failure.is_none(),
            execution_id,
            record,
            context,
            error: failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ExecutionGraph, Node, NodeType};
    use crate::store::MemoryStore;
    use crate::testing::{engine_with_mocks, MockBuildTrigger, MockDeployTrigger};
    use crate::triggers::{RetryConfig, TriggerError};
    use pretty_assertions::assert_eq;

    fn linear_graph() -> ExecutionGraph {
        ExecutionGraph::new()
            .with_node(Node::new("start", NodeType::Start))
            .with_node(Node::new("build", NodeType::CustomBuild))
            .with_node(Node::new("deploy", NodeType::Deploy))
            .with_node(Node::new("end", NodeType::End))
            .with_edge("start", "build")
            .with_edge("build", "deploy")
            .with_edge("deploy", "end")
    }

    #[tokio::test]
    async fn missing_graph_is_an_engine_error() {
        let (engine, _, _, _) = engine_with_mocks();
        let err = engine.run("ghost", "u", "p").await.unwrap_err();
        assert!(matches!(err, ForgeflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn cyclic_graph_is_an_engine_error() {
        let store = Arc::new(MemoryStore::new());
        store.put_graph(
            "p1",
            ExecutionGraph::new()
                .with_node(Node::new("a", NodeType::Start))
                .with_node(Node::new("b", NodeType::End))
                .with_edge("a", "b")
                .with_edge("b", "a"),
        );
        let dispatcher = NodeDispatcher::new(
            Arc::new(MockBuildTrigger::new()),
            Arc::new(MockDeployTrigger::new()),
        );
        let engine = ExecutionEngine::new(store, dispatcher);

        let err = engine.run("p1", "u", "p").await.unwrap_err();
        assert!(matches!(err, ForgeflowError::CycleDetected(_)));
    }

    #[tokio::test]
    async fn successful_run_threads_context_through_nodes() {
        let (engine, store, build, deploy) = engine_with_mocks();
        store.put_graph("p1", linear_graph());

        let outcome = engine.run("p1", "alice", "shop").await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.record.status, RunStatus::Success);
        assert_eq!(build.call_count(), 1);
        assert_eq!(deploy.call_count(), 1);

        // The deploy trigger saw the build id the build node produced.
        let build_id = outcome.context.build_id.clone().unwrap();
        assert_eq!(deploy.calls()[0].build_id, build_id);
        assert!(outcome.context.deployment_id.is_some());
        assert_eq!(
            outcome.context.artifact_location.unwrap(),
            format!("shop-alice-artifacts/{build_id}")
        );

        let persisted = store.load_execution(outcome.execution_id).await.unwrap();
        assert_eq!(persisted.status, RunStatus::Success);
        assert!(persisted
            .nodes
            .iter()
            .all(|entry| entry.status == NodeStatus::Success));
    }

    #[tokio::test]
    async fn first_failure_aborts_and_leaves_rest_pending() {
        let (engine, store, build, deploy) = engine_with_mocks();
        build.push_result(Err(TriggerError::new("access denied").with_status(403)));
        store.put_graph("p1", linear_graph());

        let outcome = engine.run("p1", "u", "p").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.record.status, RunStatus::Failed);
        assert_eq!(outcome.record.node_status("start"), Some(NodeStatus::Success));
        assert_eq!(outcome.record.node_status("build"), Some(NodeStatus::Failed));
        assert_eq!(outcome.record.node_status("deploy"), Some(NodeStatus::Pending));
        assert_eq!(outcome.record.node_status("end"), Some(NodeStatus::Pending));
        assert_eq!(deploy.call_count(), 0);
        assert!(outcome.error.unwrap().contains("access denied"));
    }

    #[tokio::test]
    async fn deploy_before_build_fails_the_run_without_calling_deploy() {
        let (engine, store, _, deploy) = engine_with_mocks();
        store.put_graph(
            "p1",
            ExecutionGraph::new()
                .with_node(Node::new("start", NodeType::Start))
                .with_node(Node::new("deploy", NodeType::Deploy))
                .with_edge("start", "deploy"),
        );

        let outcome = engine.run("p1", "u", "p").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.record.node_status("deploy"), Some(NodeStatus::Failed));
        assert_eq!(deploy.call_count(), 0);
        assert!(outcome.error.unwrap().contains("deploy"));
    }

    #[tokio::test]
    async fn transient_build_error_is_retried_within_the_run() {
        let (engine, store, build, _) = engine_with_mocks_with_retry(
            RetryConfig::new().with_max_attempts(3).with_base_delay_ms(1),
        );
        build.push_result(Err(TriggerError::new("throttled").with_status(503)));
        store.put_graph(
            "p1",
            ExecutionGraph::new().with_node(Node::new("build", NodeType::CustomBuild)),
        );

        let outcome = engine.run("p1", "u", "p").await.unwrap();

        assert!(outcome.success);
        assert_eq!(build.call_count(), 2);
    }

    fn engine_with_mocks_with_retry(
        retry: RetryConfig,
    ) -> (
        ExecutionEngine,
        Arc<MemoryStore>,
        Arc<MockBuildTrigger>,
        Arc<MockDeployTrigger>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher =
            NodeDispatcher::new(build.clone(), deploy.clone()).with_retry_config(retry);
        let engine = ExecutionEngine::new(store.clone(), dispatcher);
        (engine, store, build, deploy)
    }
}
