//! External build/deploy capabilities and their error model.
//!
//! The engine and launcher never talk to the managed build and deployment
//! services directly; they go through these trait seams. Production
//! implementations live with the service glue, tests use the recorders in
//! [`crate::testing`].

mod retry;

pub use retry::{with_retry, RetryConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::OnceLock;
use thiserror::Error;

/// Error reported by a build or deploy trigger call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TriggerError {
    /// HTTP-ish status code, when the underlying transport had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Service error identifier, when the service named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

#[allow(clippy::expect_used)]
fn retryable_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(
            r"(?i)(throttl|too ?many ?requests|timeout|timed ?out|connection (reset|refused|aborted|closed)|econnreset|econnrefused|etimedout)",
        )
        .expect("static pattern is valid")
    })
}

impl TriggerError {
    /// Creates an error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Sets the transport status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the service error identifier.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether the retry helper may retry this error.
    ///
    /// Retryable: server-side statuses (>= 500) and errors whose code or
    /// message matches known throttling/timeout/connection patterns.
    /// Everything else is terminal on the first attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        if matches!(self.status, Some(status) if status >= 500) {
            return true;
        }
        if let Some(code) = &self.code {
            if retryable_pattern().is_match(code) {
                return true;
            }
        }
        retryable_pattern().is_match(&self.message)
    }
}

/// Result of starting a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStarted {
    /// Service-assigned build id.
    pub build_id: String,
    /// Initial service-reported status.
    pub status: String,
    /// When the build started.
    pub start_time: DateTime<Utc>,
}

/// Result of starting a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStarted {
    /// Service-assigned deployment id.
    pub deployment_id: String,
    /// Initial service-reported status.
    pub status: String,
}

/// Deployment target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployTargetType {
    /// Virtual machine fleet.
    #[default]
    Ec2,
    /// Function runtime.
    Lambda,
    /// Container service.
    Ecs,
}

/// Rollout strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployStrategy {
    /// Replace every target at once.
    #[default]
    AllAtOnce,
    /// Replace half the targets per wave.
    HalfAtATime,
    /// Replace one target per wave.
    OneAtATime,
}

/// Configuration handed to the deploy trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Target kind.
    pub target_type: DeployTargetType,
    /// Rollout strategy.
    pub strategy: DeployStrategy,
    /// Roll back automatically when the deployment fails.
    pub rollback_on_failure: bool,
    /// Extra service-specific parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            target_type: DeployTargetType::Ec2,
            strategy: DeployStrategy::AllAtOnce,
            rollback_on_failure: true,
            parameters: BTreeMap::new(),
        }
    }
}

/// Capability that starts a build from a compiled specification.
#[async_trait]
pub trait BuildTrigger: Send + Sync + Debug {
    /// Starts a build of `project_ref` using the given spec text.
    async fn start_build(
        &self,
        project_ref: &str,
        build_spec: &str,
        env_overrides: &BTreeMap<String, String>,
    ) -> Result<BuildStarted, TriggerError>;
}

/// Capability that deploys the artifacts of a finished build.
#[async_trait]
pub trait DeployTrigger: Send + Sync + Debug {
    /// Starts a deployment of the given build.
    async fn start_deployment(
        &self,
        build_id: &str,
        config: &DeployConfig,
    ) -> Result<DeploymentStarted, TriggerError>;
}
