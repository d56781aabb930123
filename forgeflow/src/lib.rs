//! # Forgeflow
//!
//! Pipeline compiler and execution engine for block-based CI/CD
//! definitions.
//!
//! Forgeflow covers the two core paths of a visual CI/CD editor:
//!
//! - **Compilation**: a block-based [`compiler::PipelineDefinition`]
//!   becomes a phased, YAML-serializable [`compiler::BuildSpec`],
//!   including conditional fallback synthesis for blocks with an
//!   `on_failed` reference
//! - **Execution**: a node/edge [`graph::ExecutionGraph`] is scheduled
//!   topologically and walked one node at a time, threading an
//!   [`engine::ExecutionContext`] from build nodes into deploy nodes
//!
//! The external build and deployment services sit behind the
//! [`triggers::BuildTrigger`] and [`triggers::DeployTrigger`] seams;
//! transient service errors are retried with capped exponential backoff.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forgeflow::prelude::*;
//!
//! // Compile a definition to spec text.
//! let definition = PipelineDefinition::new()
//!     .with_runtime("nodejs:18")
//!     .with_block(
//!         Block::new("compile", BlockType::CustomBuildCommand, BlockGroup::Build)
//!             .with_commands(["npm run build"]),
//!     );
//! let yaml = compile(&definition).to_yaml()?;
//!
//! // Run an execution graph.
//! let engine = ExecutionEngine::new(store, NodeDispatcher::new(build, deploy));
//! let outcome = engine.run("pipeline-1", "alice", "shop").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod blocks;
pub mod compiler;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod launcher;
pub mod store;
pub mod testing;
pub mod triggers;
pub mod validate;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::blocks::{resolve_commands, Block, BlockGroup, BlockType};
    pub use crate::compiler::{compile, BuildSpec, FailurePolicy, PipelineDefinition};
    pub use crate::engine::{
        ExecutionContext, ExecutionEngine, ExecutionRecord, NodeDispatcher, NodeStatus,
        RunOutcome, RunStatus,
    };
    pub use crate::errors::{
        CycleDetectedError, ForgeflowError, ValidationError, ValidationIssue,
    };
    pub use crate::graph::{execution_order, Edge, ExecutionGraph, Node, NodeData, NodeType};
    pub use crate::launcher::BuildLauncher;
    pub use crate::store::{MemoryStore, PipelineStore};
    pub use crate::triggers::{
        with_retry, BuildStarted, BuildTrigger, DeployConfig, DeployStrategy, DeployTargetType,
        DeployTrigger, DeploymentStarted, RetryConfig, TriggerError,
    };
    pub use crate::validate::{validate_definition, validate_graph};
}
