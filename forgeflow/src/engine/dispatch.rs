//! Per-node dispatch: how each node type turns into external work.

use super::ExecutionContext;
use crate::blocks::{Block, BlockGroup, BlockType};
use crate::compiler::{compile, PipelineDefinition};
use crate::errors::ForgeflowError;
use crate::graph::{Node, NodeType};
use crate::triggers::{
    with_retry, BuildTrigger, DeployConfig, DeployTrigger, RetryConfig,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runtime used for build nodes that do not pin one.
pub const DEFAULT_NODE_RUNTIME: &str = "nodejs:18";

/// Build commands used when a node declares neither a known bundler nor
/// its own command list.
const DEFAULT_BUILD_COMMANDS: [&str; 2] = ["npm install", "npm run build"];

/// Reduces an identifier to a form the build service accepts as part of a
/// project name: lowercase alphanumerics with single dashes.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true; // suppress leading dashes
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Dispatches individual nodes against the external trigger capabilities.
#[derive(Debug, Clone)]
pub struct NodeDispatcher {
    build_trigger: Arc<dyn BuildTrigger>,
    deploy_trigger: Arc<dyn DeployTrigger>,
    retry: RetryConfig,
    default_runtime: String,
}

impl NodeDispatcher {
    /// Creates a dispatcher with default retry and runtime settings.
    #[must_use]
    pub fn new(build_trigger: Arc<dyn BuildTrigger>, deploy_trigger: Arc<dyn DeployTrigger>) -> Self {
        Self {
            build_trigger,
            deploy_trigger,
            retry: RetryConfig::default(),
            default_runtime: DEFAULT_NODE_RUNTIME.to_string(),
        }
    }

    /// Sets the retry configuration used for trigger calls.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the runtime for build nodes that do not pin one.
    #[must_use]
    pub fn with_default_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.default_runtime = runtime.into();
        self
    }

    /// Executes one node, mutating the run's context.
    pub async fn dispatch(
        &self,
        node: &Node,
        user_id: &str,
        project_id: &str,
        context: &mut ExecutionContext,
    ) -> Result<(), ForgeflowError> {
        match node.node_type {
            NodeType::Start | NodeType::End => {
                tracing::debug!(node = %node.id, kind = %node.node_type, "marker node; nothing to do");
                Ok(())
            }
            NodeType::CustomBuild | NodeType::FrameworkBuild => {
                self.dispatch_build(node, user_id, project_id, context).await
            }
            NodeType::Deploy => self.dispatch_deploy(node, context).await,
            NodeType::Test => {
                // TODO: wire test nodes to the build service once the test
                // runner image is available; until then they pass through.
                tracing::info!(node = %node.id, "test node execution not implemented; passing context through");
                Ok(())
            }
            NodeType::Unknown => {
                tracing::warn!(node = %node.id, "unknown node type; passing context through");
                Ok(())
            }
        }
    }

    async fn dispatch_build(
        &self,
        node: &Node,
        user_id: &str,
        project_id: &str,
        context: &mut ExecutionContext,
    ) -> Result<(), ForgeflowError> {
        let project_name = format!("{}-{}", sanitize(project_id), sanitize(user_id));
        let definition = self.build_definition(node);
        let spec_text = compile(&definition).to_yaml()?;
        let env_overrides = BTreeMap::new();

        tracing::info!(node = %node.id, project = %project_name, "starting build for node");
        let started = with_retry(&self.retry, &format!("build:{}", node.id), || {
            self.build_trigger
                .start_build(&project_name, &spec_text, &env_overrides)
        })
        .await?;

        context.artifact_location =
            Some(format!("{project_name}-artifacts/{}", started.build_id));
        context.build_id = Some(started.build_id);
        Ok(())
    }

    async fn dispatch_deploy(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> Result<(), ForgeflowError> {
        let Some(build_id) = context.build_id.clone() else {
            return Err(ForgeflowError::MissingBuildId {
                node: node.id.clone(),
            });
        };

        let mut config = DeployConfig::default();
        if let Some(target_type) = node.data.target_type {
            config.target_type = target_type;
        }
        if let Some(strategy) = node.data.strategy {
            config.strategy = strategy;
        }
        if let Some(rollback) = node.data.rollback_on_failure {
            config.rollback_on_failure = rollback;
        }

        tracing::info!(node = %node.id, build_id = %build_id, "starting deployment for node");
        let started = with_retry(&self.retry, &format!("deploy:{}", node.id), || {
            self.deploy_trigger.start_deployment(&build_id, &config)
        })
        .await?;

        context.deployment_id = Some(started.deployment_id);
        Ok(())
    }

    /// Builds the one-block definition a build node compiles through.
    ///
    /// The same compiler serves the editor path and this per-node path; a
    /// node only parameterizes the commands and runtime.
    fn build_definition(&self, node: &Node) -> PipelineDefinition {
        let commands: Vec<String> = match node.node_type {
            NodeType::FrameworkBuild => match node.data.bundler.as_deref() {
                Some("webpack") => {
                    vec!["npm install".to_string(), "npx webpack --mode production".to_string()]
                }
                Some(other) => {
                    tracing::warn!(node = %node.id, bundler = other, "unknown bundler; using default build commands");
                    DEFAULT_BUILD_COMMANDS.iter().map(ToString::to_string).collect()
                }
                None => DEFAULT_BUILD_COMMANDS.iter().map(ToString::to_string).collect(),
            },
            _ if !node.data.commands.is_empty() => node.data.commands.clone(),
            _ => DEFAULT_BUILD_COMMANDS.iter().map(ToString::to_string).collect(),
        };

        let runtime = node
            .data
            .runtime
            .clone()
            .unwrap_or_else(|| self.default_runtime.clone());

        PipelineDefinition::new().with_runtime(runtime).with_block(
            Block::new(node.id.clone(), BlockType::CustomBuildCommand, BlockGroup::Build)
                .with_commands(commands),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeData;
    use crate::testing::{MockBuildTrigger, MockDeployTrigger};
    use pretty_assertions::assert_eq;

    fn dispatcher(
        build: Arc<MockBuildTrigger>,
        deploy: Arc<MockDeployTrigger>,
    ) -> NodeDispatcher {
        NodeDispatcher::new(build, deploy)
            .with_retry_config(RetryConfig::new().with_max_attempts(1).with_base_delay_ms(1))
    }

    #[test]
    fn sanitize_lowercases_and_collapses() {
        assert_eq!(sanitize("My Project!!v2"), "my-project-v2");
        assert_eq!(sanitize("--weird--"), "weird");
        assert_eq!(sanitize("simple"), "simple");
        assert_eq!(sanitize(""), "");
    }

    #[tokio::test]
    async fn build_node_sets_context_and_derives_names() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build.clone(), deploy);

        let node = Node::new("build-1", NodeType::CustomBuild).with_data(NodeData {
            commands: vec!["make".to_string()],
            ..NodeData::default()
        });
        let mut context = ExecutionContext::new();
        dispatcher
            .dispatch(&node, "User42", "My App", &mut context)
            .await
            .unwrap();

        let calls = build.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].project_ref, "my-app-user42");
        assert!(calls[0].build_spec.contains("make"));
        assert!(calls[0].build_spec.contains("nodejs: '18'"));

        let build_id = context.build_id.clone().unwrap();
        assert_eq!(
            context.artifact_location.unwrap(),
            format!("my-app-user42-artifacts/{build_id}")
        );
    }

    #[tokio::test]
    async fn framework_build_uses_bundler_sequence() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build.clone(), deploy);

        let node = Node::new("fw", NodeType::FrameworkBuild).with_data(NodeData {
            bundler: Some("webpack".to_string()),
            ..NodeData::default()
        });
        let mut context = ExecutionContext::new();
        dispatcher.dispatch(&node, "u", "p", &mut context).await.unwrap();

        let spec = &build.calls()[0].build_spec;
        assert!(spec.contains("npm install"));
        assert!(spec.contains("npx webpack --mode production"));
    }

    #[tokio::test]
    async fn build_node_without_commands_falls_back_to_default() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build.clone(), deploy);

        let node = Node::new("plain", NodeType::CustomBuild);
        let mut context = ExecutionContext::new();
        dispatcher.dispatch(&node, "u", "p", &mut context).await.unwrap();

        assert!(build.calls()[0].build_spec.contains("npm run build"));
    }

    #[tokio::test]
    async fn deploy_without_build_fails_without_calling_trigger() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build, deploy.clone());

        let node = Node::new("ship", NodeType::Deploy);
        let mut context = ExecutionContext::new();
        let err = dispatcher
            .dispatch(&node, "u", "p", &mut context)
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeflowError::MissingBuildId { .. }));
        assert_eq!(deploy.call_count(), 0);
    }

    #[tokio::test]
    async fn deploy_uses_defaults_and_node_overrides() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build, deploy.clone());

        let node = Node::new("ship", NodeType::Deploy).with_data(NodeData {
            rollback_on_failure: Some(false),
            ..NodeData::default()
        });
        let mut context = ExecutionContext::new();
        context.build_id = Some("build-7".to_string());

        dispatcher.dispatch(&node, "u", "p", &mut context).await.unwrap();

        let calls = deploy.calls();
        assert_eq!(calls[0].build_id, "build-7");
        assert_eq!(calls[0].config.target_type, crate::triggers::DeployTargetType::Ec2);
        assert_eq!(calls[0].config.strategy, crate::triggers::DeployStrategy::AllAtOnce);
        assert!(!calls[0].config.rollback_on_failure);
        assert!(context.deployment_id.is_some());
    }

    #[tokio::test]
    async fn marker_and_placeholder_nodes_leave_context_unchanged() {
        let build = Arc::new(MockBuildTrigger::new());
        let deploy = Arc::new(MockDeployTrigger::new());
        let dispatcher = dispatcher(build.clone(), deploy.clone());

        let mut context = ExecutionContext::new();
        for node in [
            Node::new("s", NodeType::Start),
            Node::new("e", NodeType::End),
            Node::new("t", NodeType::Test),
            Node::new("x", NodeType::Unknown),
        ] {
            dispatcher.dispatch(&node, "u", "p", &mut context).await.unwrap();
        }

        assert_eq!(context, ExecutionContext::new());
        assert_eq!(build.call_count(), 0);
        assert_eq!(deploy.call_count(), 0);
    }
}
