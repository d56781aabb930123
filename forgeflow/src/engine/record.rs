//! Per-run execution records, for observability only.
//!
//! Node statuses never feed back into control flow; the engine records
//! them so the surrounding system can show run progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of one node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet dispatched.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Completed without error.
    Success,
    /// Raised an error; aborted the run.
    Failed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Nodes are still executing.
    #[default]
    Running,
    /// Every node completed without error.
    Success,
    /// A node raised and aborted the run.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status entry for one node, in scheduled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The node id.
    pub node_id: String,
    /// Its current status.
    pub status: NodeStatus,
}

/// One engine run, as persisted for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique id of this run.
    pub execution_id: Uuid,
    /// The pipeline that was run.
    pub pipeline_id: String,
    /// Overall status.
    pub status: RunStatus,
    /// Per-node statuses in scheduled order.
    pub nodes: Vec<NodeRecord>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// Creates a record with every node pending.
    #[must_use]
    pub fn new(
        pipeline_id: impl Into<String>,
        node_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            pipeline_id: pipeline_id.into(),
            status: RunStatus::Running,
            nodes: node_ids
                .into_iter()
                .map(|id| NodeRecord {
                    node_id: id.into(),
                    status: NodeStatus::Pending,
                })
                .collect(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Updates one node's status.
    pub fn set_node_status(&mut self, node_id: &str, status: NodeStatus) {
        if let Some(entry) = self.nodes.iter_mut().find(|entry| entry.node_id == node_id) {
            entry.status = status;
        }
    }

    /// Reads one node's status.
    #[must_use]
    pub fn node_status(&self, node_id: &str) -> Option<NodeStatus> {
        self.nodes
            .iter()
            .find(|entry| entry.node_id == node_id)
            .map(|entry| entry.status)
    }

    /// Marks the run terminal.
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_running_with_pending_nodes() {
        let record = ExecutionRecord::new("p1", ["a", "b"]);
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.nodes.len(), 2);
        assert!(record
            .nodes
            .iter()
            .all(|entry| entry.status == NodeStatus::Pending));
        assert!(record.finished_at.is_none());
    }

    #[test]
    fn node_status_updates_preserve_order() {
        let mut record = ExecutionRecord::new("p1", ["a", "b", "c"]);
        record.set_node_status("b", NodeStatus::Failed);

        assert_eq!(record.node_status("a"), Some(NodeStatus::Pending));
        assert_eq!(record.node_status("b"), Some(NodeStatus::Failed));
        assert_eq!(record.nodes[1].node_id, "b");
        assert_eq!(record.node_status("ghost"), None);
    }

    #[test]
    fn finish_sets_terminal_state() {
        let mut record = ExecutionRecord::new("p1", ["a"]);
        record.finish(RunStatus::Failed);
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&NodeStatus::Pending).unwrap(), r#""pending""#);
        assert_eq!(serde_json::to_string(&RunStatus::Failed).unwrap(), r#""failed""#);
    }
}
