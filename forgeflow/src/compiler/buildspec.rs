//! The phased build specification consumed by the external build service.
//!
//! These types serialize to the service's YAML-shaped text format. Every
//! phase and section is omitted entirely when empty; the compiler never
//! emits an empty block.

use crate::errors::ForgeflowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What the build service should do when a phase's command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    /// Stop the build at the first failing command.
    #[default]
    Abort,
    /// Record the failure but keep going (used for test phases so a failing
    /// test cannot prevent artifact upload).
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "ABORT"),
            Self::Continue => write!(f, "CONTINUE"),
        }
    }
}

/// The `install` phase: runtime versions only, no commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPhase {
    /// Runtime name to version, e.g. `nodejs: "18"`.
    #[serde(
        rename = "runtime-versions",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub runtime_versions: BTreeMap<String, String>,
}

/// A command-bearing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Ordered command lines.
    pub commands: Vec<String>,
    /// Failure policy for the phase.
    #[serde(rename = "on-failure", default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,
}

impl Phase {
    /// Creates a phase from commands and a policy.
    #[must_use]
    pub fn new(commands: Vec<String>, on_failure: FailurePolicy) -> Self {
        Self {
            commands,
            on_failure: Some(on_failure),
        }
    }
}

/// All phases of a build specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phases {
    /// Runtime installation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallPhase>,
    /// Commands from CUSTOM-group blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<Phase>,
    /// Commands from BUILD-group blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Phase>,
    /// Commands from TEST-group blocks followed by RUN-group blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_build: Option<Phase>,
    /// Always-run phase. Part of the target format; the compiler never
    /// populates it.
    #[serde(rename = "finally", default, skip_serializing_if = "Option::is_none")]
    pub finally_phase: Option<Phase>,
}

impl Phases {
    /// Returns true when no phase is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.install.is_none()
            && self.pre_build.is_none()
            && self.build.is_none()
            && self.post_build.is_none()
            && self.finally_phase.is_none()
    }
}

/// The `artifacts` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsSection {
    /// Path globs to collect after the build.
    pub files: Vec<String>,
}

/// The `env` section: plain variables plus secret references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSection {
    /// Plain environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    /// Variable name to secret reference.
    #[serde(
        rename = "secrets-manager",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub secrets_manager: BTreeMap<String, String>,
}

impl EnvSection {
    /// Returns true when neither variables nor secrets are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.secrets_manager.is_empty()
    }
}

/// The `cache` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Paths to persist between builds.
    pub paths: Vec<String>,
}

/// One named report group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroup {
    /// Report file globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Report file format, e.g. `JUNITXML`.
    #[serde(rename = "file-format", default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    /// Directory the file globs are relative to.
    #[serde(
        rename = "base-directory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub base_directory: Option<String>,
    /// Whether to flatten paths when uploading.
    #[serde(
        rename = "discard-paths",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub discard_paths: Option<bool>,
}

/// A compiled build specification.
///
/// Ephemeral by design: recomputed from the stored definition on every
/// trigger and never treated as authoritative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Spec format version.
    pub version: String,
    /// Build phases.
    #[serde(default, skip_serializing_if = "Phases::is_empty")]
    pub phases: Phases,
    /// Artifact collection, present only when paths were declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactsSection>,
    /// Environment, present only when variables or secrets were declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvSection>,
    /// Cache paths, present only when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,
    /// Named report groups.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reports: BTreeMap<String, ReportGroup>,
}

impl BuildSpec {
    /// Serializes the specification to its textual (YAML) form.
    pub fn to_yaml(&self) -> Result<String, ForgeflowError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
