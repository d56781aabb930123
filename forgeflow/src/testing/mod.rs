//! Test doubles and fixtures.
//!
//! Recording mocks for the build/deploy trigger seams plus small fixture
//! builders. Available outside `cfg(test)` so downstream crates can test
//! their own glue against the same doubles.

use crate::blocks::{Block, BlockGroup, BlockType};
use crate::compiler::PipelineDefinition;
use crate::engine::{ExecutionEngine, NodeDispatcher};
use crate::graph::{ExecutionGraph, Node, NodeType};
use crate::store::MemoryStore;
use crate::triggers::{
    BuildStarted, BuildTrigger, DeployConfig, DeployTrigger, DeploymentStarted, RetryConfig,
    TriggerError,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// One recorded call to [`MockBuildTrigger::start_build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCall {
    /// Project reference the build was started for.
    pub project_ref: String,
    /// The compiled spec text that was submitted.
    pub build_spec: String,
    /// Environment overrides passed along.
    pub env_overrides: BTreeMap<String, String>,
}

/// Recording [`BuildTrigger`].
///
/// Returns scripted results first; once the script is exhausted, every
/// call succeeds with a sequential `build-{n}` id.
#[derive(Debug, Default)]
pub struct MockBuildTrigger {
    calls: Mutex<Vec<BuildCall>>,
    script: Mutex<VecDeque<Result<BuildStarted, TriggerError>>>,
}

impl MockBuildTrigger {
    /// Creates an unscripted mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result for an upcoming call.
    pub fn push_result(&self, result: Result<BuildStarted, TriggerError>) {
        self.script.lock().push_back(result);
    }

    /// All calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().clone()
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BuildTrigger for MockBuildTrigger {
    async fn start_build(
        &self,
        project_ref: &str,
        build_spec: &str,
        env_overrides: &BTreeMap<String, String>,
    ) -> Result<BuildStarted, TriggerError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(BuildCall {
                project_ref: project_ref.to_string(),
                build_spec: build_spec.to_string(),
                env_overrides: env_overrides.clone(),
            });
            calls.len()
        };
        if let Some(scripted) = self.script.lock().pop_front() {
            return scripted;
        }
        Ok(BuildStarted {
            build_id: format!("build-{n}"),
            status: "IN_PROGRESS".to_string(),
            start_time: Utc::now(),
        })
    }
}

/// One recorded call to [`MockDeployTrigger::start_deployment`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeployCall {
    /// Build whose artifacts were deployed.
    pub build_id: String,
    /// The configuration handed over.
    pub config: DeployConfig,
}

/// Recording [`DeployTrigger`], scripted the same way as
/// [`MockBuildTrigger`]; unscripted calls succeed with `deploy-{n}` ids.
#[derive(Debug, Default)]
pub struct MockDeployTrigger {
    calls: Mutex<Vec<DeployCall>>,
    script: Mutex<VecDeque<Result<DeploymentStarted, TriggerError>>>,
}

impl MockDeployTrigger {
    /// Creates an unscripted mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result for an upcoming call.
    pub fn push_result(&self, result: Result<DeploymentStarted, TriggerError>) {
        self.script.lock().push_back(result);
    }

    /// All calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DeployCall> {
        self.calls.lock().clone()
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl DeployTrigger for MockDeployTrigger {
    async fn start_deployment(
        &self,
        build_id: &str,
        config: &DeployConfig,
    ) -> Result<DeploymentStarted, TriggerError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(DeployCall {
                build_id: build_id.to_string(),
                config: config.clone(),
            });
            calls.len()
        };
        if let Some(scripted) = self.script.lock().pop_front() {
            return scripted;
        }
        Ok(DeploymentStarted {
            deployment_id: format!("deploy-{n}"),
            status: "Created".to_string(),
        })
    }
}

/// Installs a tracing subscriber that writes through the test harness.
///
/// Repeated calls are no-ops, so every test can call it unconditionally.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine wired to an empty in-memory store and fresh mocks, with
/// retry delays shrunk so failing tests do not sleep.
#[must_use]
pub fn engine_with_mocks() -> (
    ExecutionEngine,
    Arc<MemoryStore>,
    Arc<MockBuildTrigger>,
    Arc<MockDeployTrigger>,
) {
    let store = Arc::new(MemoryStore::new());
    let build = Arc::new(MockBuildTrigger::new());
    let deploy = Arc::new(MockDeployTrigger::new());
    let dispatcher = NodeDispatcher::new(build.clone(), deploy.clone()).with_retry_config(
        RetryConfig::new()
            .with_max_attempts(2)
            .with_base_delay_ms(1)
            .with_max_delay_ms(2),
    );
    let engine = ExecutionEngine::new(store.clone(), dispatcher);
    (engine, store, build, deploy)
}

/// A definition exercising every phase: OS and Node installs, a build
/// with a fallback, a test block, and a run block.
#[must_use]
pub fn sample_definition() -> PipelineDefinition {
    PipelineDefinition::new()
        .with_runtime("nodejs:18")
        .with_block(
            Block::new("os-deps", BlockType::OsPackageManager, BlockGroup::Custom)
                .with_manager("apt-get")
                .with_packages(["curl", "git"]),
        )
        .with_block(
            Block::new("node-deps", BlockType::NodePackageManager, BlockGroup::Custom)
                .with_manager("npm"),
        )
        .with_block(
            Block::new("compile", BlockType::CustomBuildCommand, BlockGroup::Build)
                .with_commands(["npm run build"])
                .with_on_failed("compile-fallback"),
        )
        .with_block(
            Block::new("compile-fallback", BlockType::CustomBuildCommand, BlockGroup::Build)
                .with_commands(["npm run build -- --no-cache"]),
        )
        .with_block(
            Block::new("unit-tests", BlockType::NodeTestCommand, BlockGroup::Test)
                .with_commands(["npm test"]),
        )
        .with_block(
            Block::new("smoke", BlockType::CustomRunCommand, BlockGroup::Run)
                .with_commands(["node scripts/smoke.js"]),
        )
}

/// A linear start -> build -> deploy -> end graph.
#[must_use]
pub fn sample_graph() -> ExecutionGraph {
    ExecutionGraph::new()
        .with_node(Node::new("start", NodeType::Start))
        .with_node(Node::new("build", NodeType::CustomBuild))
        .with_node(Node::new("deploy", NodeType::Deploy))
        .with_node(Node::new("end", NodeType::End))
        .with_edge("start", "build")
        .with_edge("build", "deploy")
        .with_edge("deploy", "end")
}
