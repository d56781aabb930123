//! The execution context threaded across node execution within one run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mutable accumulator owned by exactly one in-flight engine run.
///
/// Build nodes populate `build_id`/`artifact_location`; deploy nodes read
/// `build_id` and populate `deployment_id`. Never shared or merged across
/// runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Id of the most recent build started in this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Where that build's artifacts were placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_location: Option<String>,
    /// Id of the most recent deployment started in this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Open-ended extra keys for node types added later.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an extra key.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.extra.insert(key.into(), value);
    }
}
