//! Execution order resolution over the node/edge graph.
//!
//! Kahn's algorithm: a node is scheduled only once every predecessor has
//! been scheduled, so a join waits for all of its branches. Ties break by
//! declaration order, which keeps the result deterministic. A graph whose
//! nodes cannot all be scheduled contains a cycle and fails explicitly.

use super::{ExecutionGraph, Node};
use crate::errors::CycleDetectedError;
use std::collections::{HashMap, VecDeque};

/// Computes a dependency-respecting linear visitation order.
///
/// Edges whose endpoints do not exist are skipped here with a log line;
/// [`crate::validate::validate_graph`] reports them to authors.
pub fn execution_order(graph: &ExecutionGraph) -> Result<Vec<&Node>, CycleDetectedError> {
    let index_of: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; graph.nodes.len()];

    for edge in &graph.edges {
        let (Some(&source), Some(&target)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) else {
            tracing::warn!(
                source = %edge.source,
                target = %edge.target,
                "edge references a missing node; ignoring it for ordering"
            );
            continue;
        };
        successors[source].push(target);
        in_degree[target] += 1;
    }

    let mut ready: VecDeque<usize> = (0..graph.nodes.len())
        .filter(|&index| in_degree[index] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(index) = ready.pop_front() {
        order.push(&graph.nodes[index]);
        for &successor in &successors[index] {
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                ready.push_back(successor);
            }
        }
    }

    if order.len() != graph.nodes.len() {
        let stuck: Vec<String> = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|&(index, _)| in_degree[index] > 0)
            .map(|(_, node)| node.id.clone())
            .collect();
        return Err(CycleDetectedError::new(stuck));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;

    fn ids<'a>(order: &[&'a Node]) -> Vec<&'a str> {
        order.iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn two_node_chain() {
        let graph = ExecutionGraph::new()
            .with_node(Node::new("a", NodeType::Start))
            .with_node(Node::new("b", NodeType::End))
            .with_edge("a", "b");

        let order = execution_order(&graph).unwrap();
        assert_eq!(ids(&order), vec!["a", "b"]);
    }

    #[test]
    fn join_waits_for_all_predecessors() {
        // a -> b -> d and a -> c -> d; d must come after both b and c,
        // whatever branch is declared first.
        let graph = ExecutionGraph::new()
            .with_node(Node::new("a", NodeType::Start))
            .with_node(Node::new("b", NodeType::CustomBuild))
            .with_node(Node::new("c", NodeType::CustomBuild))
            .with_node(Node::new("d", NodeType::End))
            .with_edge("a", "b")
            .with_edge("b", "d")
            .with_edge("a", "c")
            .with_edge("c", "d");

        let order = execution_order(&graph).unwrap();
        let position = |id: &str| order.iter().position(|n| n.id == id).unwrap();
        assert!(position("d") > position("b"));
        assert!(position("d") > position("c"));
        assert_eq!(position("a"), 0);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let graph = ExecutionGraph::new()
            .with_node(Node::new("x", NodeType::CustomBuild))
            .with_node(Node::new("y", NodeType::CustomBuild))
            .with_node(Node::new("z", NodeType::CustomBuild));

        let order = execution_order(&graph).unwrap();
        assert_eq!(ids(&order), vec!["x", "y", "z"]);
    }

    #[test]
    fn cycle_is_an_explicit_error() {
        let graph = ExecutionGraph::new()
            .with_node(Node::new("a", NodeType::Start))
            .with_node(Node::new("b", NodeType::CustomBuild))
            .with_node(Node::new("c", NodeType::CustomBuild))
            .with_edge("a", "b")
            .with_edge("b", "c")
            .with_edge("c", "b");

        let err = execution_order(&graph).unwrap_err();
        assert!(err.nodes.contains(&"b".to_string()));
        assert!(err.nodes.contains(&"c".to_string()));
        assert!(!err.nodes.contains(&"a".to_string()));
    }

    #[test]
    fn dangling_edges_are_ignored_for_ordering() {
        let graph = ExecutionGraph::new()
            .with_node(Node::new("a", NodeType::Start))
            .with_edge("a", "ghost");

        let order = execution_order(&graph).unwrap();
        assert_eq!(ids(&order), vec!["a"]);
    }

    #[test]
    fn empty_graph_orders_to_nothing() {
        let graph = ExecutionGraph::new();
        let order = execution_order(&graph).unwrap();
        assert!(order.is_empty());
    }
}
