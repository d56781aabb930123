//! Execution graph model: typed nodes plus directed edges.
//!
//! This is the visual node/edge representation walked by the execution
//! engine. It is deliberately distinct from the block model: different id
//! space, different type vocabulary.

mod order;

pub use order::execution_order;

use crate::triggers::{DeployStrategy, DeployTargetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The type of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// Entry marker; no work.
    Start,
    /// Exit marker; no work.
    End,
    /// Build stage running the node's own command list.
    CustomBuild,
    /// Build stage for a known framework bundler.
    FrameworkBuild,
    /// Deployment stage; requires a prior build in the run.
    Deploy,
    /// Test stage. Currently a logged pass-through placeholder.
    Test,
    /// Any type this engine does not recognize; dispatched as a logged
    /// pass-through.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::CustomBuild => write!(f, "custom-build"),
            Self::FrameworkBuild => write!(f, "framework-build"),
            Self::Deploy => write!(f, "deploy"),
            Self::Test => write!(f, "test"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-node payload. All fields optional; unknown keys are kept in `extra`
/// so foreign documents survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    /// Literal build commands for custom-build nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// Runtime override as `name:version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Bundler name for framework-build nodes (e.g. `webpack`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundler: Option<String>,
    /// Deployment target override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<DeployTargetType>,
    /// Deployment strategy override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeployStrategy>,
    /// Whether to roll back a failed deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_on_failure: Option<bool>,
    /// Anything else the editor attached.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One node of an execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id within the graph.
    pub id: String,
    /// The node type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Per-type payload.
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Creates a node with empty data.
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            data: NodeData::default(),
        }
    }

    /// Sets the node data.
    #[must_use]
    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
}

impl Edge {
    /// Creates an edge.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An execution graph: nodes in declaration order plus directed edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionGraph {
    /// Graph nodes.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ExecutionGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node.
    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge.
    #[must_use]
    pub fn with_edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edges.push(Edge::new(source, target));
        self
    }

    /// Looks a node up by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&NodeType::FrameworkBuild).unwrap(),
            r#""framework-build""#
        );
        let parsed: NodeType = serde_json::from_str(r#""deploy""#).unwrap();
        assert_eq!(parsed, NodeType::Deploy);
    }

    #[test]
    fn unrecognized_node_type_becomes_unknown() {
        let parsed: NodeType = serde_json::from_str(r#""parallel-execution""#).unwrap();
        assert_eq!(parsed, NodeType::Unknown);
    }

    #[test]
    fn node_data_keeps_extra_keys() {
        let json = r#"{"commands":["make"],"color":"blue"}"#;
        let data: NodeData = serde_json::from_str(json).unwrap();
        assert_eq!(data.commands, vec!["make".to_string()]);
        assert_eq!(
            data.extra.get("color").unwrap(),
            &serde_json::Value::String("blue".to_string())
        );
    }

    #[test]
    fn graph_round_trip() {
        let graph = ExecutionGraph::new()
            .with_node(Node::new("start", NodeType::Start))
            .with_node(Node::new("build", NodeType::CustomBuild))
            .with_edge("start", "build");

        let json = serde_json::to_string(&graph).unwrap();
        let back: ExecutionGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
        assert!(back.node("build").is_some());
        assert!(back.node("ghost").is_none());
    }
}
