//! Error types for the forgeflow crate.
//!
//! One umbrella enum plus dedicated types for the cases that carry
//! structure: authoring-time validation issues, graph cycles, and
//! failures reported by the external build/deploy triggers.

use crate::triggers::TriggerError;
use std::fmt;
use thiserror::Error;

/// The main error type for forgeflow operations.
#[derive(Debug, Error)]
pub enum ForgeflowError {
    /// The definition or graph failed authoring-time validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A cycle was detected in the execution graph.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A deploy node ran before any build node populated the context.
    #[error("deploy node '{node}' has no build id in context; a build node must run first")]
    MissingBuildId {
        /// The deploy node that was dispatched.
        node: String,
    },

    /// A stored document was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external trigger call failed.
    #[error("{0}")]
    Trigger(#[from] TriggerError),

    /// A node execution error.
    #[error("execution error: {0}")]
    Execution(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ForgeflowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ForgeflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A single problem found by the authoring-time validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// An `on_success`/`on_failed` pointer names a block that does not exist.
    UnresolvedReference {
        /// The block holding the pointer.
        block: String,
        /// Which field held the pointer (`on_success` or `on_failed`).
        field: &'static str,
        /// The id that could not be resolved.
        target: String,
    },
    /// Two blocks share the same id.
    DuplicateBlockId {
        /// The duplicated id.
        id: String,
    },
    /// A block carries a type this compiler does not recognize.
    UnknownBlockType {
        /// The block id.
        id: String,
    },
    /// Two graph nodes share the same id.
    DuplicateNodeId {
        /// The duplicated id.
        id: String,
    },
    /// A node carries a type the engine does not recognize.
    UnknownNodeType {
        /// The node id.
        id: String,
    },
    /// An edge endpoint names a node that does not exist.
    DanglingEdge {
        /// The edge source id.
        source: String,
        /// The edge target id.
        target: String,
        /// Which endpoint was missing.
        missing: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { block, field, target } => write!(
                f,
                "block '{block}' references missing block '{target}' via {field}"
            ),
            Self::DuplicateBlockId { id } => write!(f, "duplicate block id '{id}'"),
            Self::UnknownBlockType { id } => write!(f, "block '{id}' has an unknown type"),
            Self::DuplicateNodeId { id } => write!(f, "duplicate node id '{id}'"),
            Self::UnknownNodeType { id } => write!(f, "node '{id}' has an unknown type"),
            Self::DanglingEdge { source, target, missing } => write!(
                f,
                "edge '{source}' -> '{target}' references missing node '{missing}'"
            ),
        }
    }
}

/// Error raised when validation finds one or more issues.
///
/// Every issue is collected before returning, so a single pass reports
/// all authoring mistakes rather than stopping at the first.
#[derive(Debug, Clone, Error)]
pub struct ValidationError {
    /// All issues found, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Creates a validation error from a non-empty issue list.
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} issue(s): ", self.issues.len())?;
        let rendered: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Error raised when the execution graph contains a dependency cycle.
#[derive(Debug, Clone, Error)]
#[error("cycle detected in execution graph; nodes on a cycle: {}", nodes.join(", "))]
pub struct CycleDetectedError {
    /// Ids of nodes that could never be scheduled.
    pub nodes: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }
}
