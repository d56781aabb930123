//! Authoring-time validation for definitions and graphs.
//!
//! The compiler and resolver stay total: unknown types yield nothing and
//! missing references are skipped. This pass is where those authoring
//! mistakes become visible. Every issue in a document is collected before
//! returning, so one round trip reports them all.

use crate::blocks::BlockType;
use crate::compiler::PipelineDefinition;
use crate::errors::{ValidationError, ValidationIssue};
use crate::graph::{ExecutionGraph, NodeType};
use std::collections::HashSet;

/// Validates a block-based pipeline definition.
///
/// Checks for duplicate block ids, unknown block types, and
/// `on_success`/`on_failed` references that do not resolve to a block in
/// the same definition.
pub fn validate_definition(definition: &PipelineDefinition) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for block in &definition.blocks {
        if !seen.insert(block.id.as_str()) {
            issues.push(ValidationIssue::DuplicateBlockId {
                id: block.id.clone(),
            });
        }
        if block.block_type == BlockType::Unknown {
            issues.push(ValidationIssue::UnknownBlockType {
                id: block.id.clone(),
            });
        }
    }

    let known: HashSet<&str> = definition.blocks.iter().map(|b| b.id.as_str()).collect();
    for block in &definition.blocks {
        for (field, reference) in [
            ("on_success", &block.on_success),
            ("on_failed", &block.on_failed),
        ] {
            if let Some(target) = reference {
                if !known.contains(target.as_str()) {
                    issues.push(ValidationIssue::UnresolvedReference {
                        block: block.id.clone(),
                        field,
                        target: target.clone(),
                    });
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Validates an execution graph.
///
/// Checks for duplicate node ids, unknown node types, and edges whose
/// endpoints name no node. Cycle detection is not repeated here; the
/// scheduler reports cycles when it orders the graph.
pub fn validate_graph(graph: &ExecutionGraph) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            issues.push(ValidationIssue::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
        if node.node_type == NodeType::Unknown {
            issues.push(ValidationIssue::UnknownNodeType {
                id: node.id.clone(),
            });
        }
    }

    let known: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !known.contains(endpoint.as_str()) {
                issues.push(ValidationIssue::DanglingEdge {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}
