//! Pipeline compiler: block definition in, phased build specification out.
//!
//! [`compile`] is deterministic, synchronous, and total: any well-typed
//! definition compiles without error. Unresolved fallback references
//! yield zero inlined commands (the validation pass in [`crate::validate`]
//! is the authoring-time surface for those mistakes).

mod buildspec;

pub use buildspec::{
    ArtifactsSection, BuildSpec, CacheSection, EnvSection, FailurePolicy, InstallPhase, Phase,
    Phases, ReportGroup,
};

use crate::blocks::{resolve_commands, Block, BlockGroup};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Spec format version emitted when a definition does not pin one.
pub const DEFAULT_SPEC_VERSION: &str = "0.2";

/// A stored, editor-authored pipeline definition.
///
/// Read immediately before a build is triggered; never mutated by the
/// compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Build-spec format version; defaults to [`DEFAULT_SPEC_VERSION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Runtime as `name` or `name:version`; version defaults to `latest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Ordered blocks. Order within each group is preserved in the output.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Artifact path globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// Plain environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,
    /// Variable name to secret reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
    /// Paths cached between builds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_paths: Vec<String>,
    /// Named report groups, copied into the spec as-is.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reports: BTreeMap<String, ReportGroup>,
    /// Default failure policy for the pre_build and build phases.
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

impl PipelineDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime (`name` or `name:version`).
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Appends a block.
    #[must_use]
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Sets the artifact globs.
    #[must_use]
    pub fn with_artifacts(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.artifacts = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one environment variable.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(name.into(), value.into());
        self
    }

    /// Adds one secret reference.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), reference.into());
        self
    }

    /// Adds one cache path.
    #[must_use]
    pub fn with_cache_path(mut self, path: impl Into<String>) -> Self {
        self.cache_paths.push(path.into());
        self
    }

    /// Adds one named report group.
    #[must_use]
    pub fn with_report(mut self, name: impl Into<String>, report: ReportGroup) -> Self {
        self.reports.insert(name.into(), report);
        self
    }

    /// Sets the default failure policy.
    #[must_use]
    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }
}

/// Comment label and echo prefix for one bucket's rendered commands.
struct BucketStyle {
    comment: &'static str,
    label: &'static str,
}

const CUSTOM_BUILD_STYLE: BucketStyle = BucketStyle { comment: "Block", label: "Block" };
const TEST_STYLE: BucketStyle = BucketStyle { comment: "Test Block", label: "Test block" };
const RUN_STYLE: BucketStyle = BucketStyle { comment: "Run Block", label: "Run block" };

/// Compiles a pipeline definition into a build specification.
#[must_use]
pub fn compile(definition: &PipelineDefinition) -> BuildSpec {
    let mut spec = BuildSpec {
        version: definition
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_SPEC_VERSION.to_string()),
        ..BuildSpec::default()
    };

    if let Some(runtime) = definition.runtime.as_deref() {
        let (name, version) = match runtime.split_once(':') {
            Some((name, version)) => (name, version),
            None => (runtime, "latest"),
        };
        let mut install = InstallPhase::default();
        install
            .runtime_versions
            .insert(name.to_string(), version.to_string());
        spec.phases.install = Some(install);
    }

    let index: HashMap<&str, &Block> = definition
        .blocks
        .iter()
        .map(|block| (block.id.as_str(), block))
        .collect();

    let pre_build = render_bucket(definition, &index, BlockGroup::Custom, &CUSTOM_BUILD_STYLE);
    if !pre_build.is_empty() {
        spec.phases.pre_build = Some(Phase::new(pre_build, definition.on_failure));
    }

    let build = render_bucket(definition, &index, BlockGroup::Build, &CUSTOM_BUILD_STYLE);
    if !build.is_empty() {
        spec.phases.build = Some(Phase::new(build, definition.on_failure));
    }

    // TEST commands first, RUN appended, regardless of source interleaving.
    // The phase is CONTINUE so a failing test cannot block artifact upload;
    // RUN-only pipelines inherit that policy too.
    let mut post_build = render_bucket(definition, &index, BlockGroup::Test, &TEST_STYLE);
    post_build.extend(render_bucket(definition, &index, BlockGroup::Run, &RUN_STYLE));
    if !post_build.is_empty() {
        spec.phases.post_build = Some(Phase::new(post_build, FailurePolicy::Continue));
    }

    if !definition.artifacts.is_empty() {
        spec.artifacts = Some(ArtifactsSection {
            files: definition.artifacts.clone(),
        });
    }

    if !definition.environment_variables.is_empty() || !definition.secrets.is_empty() {
        spec.env = Some(EnvSection {
            variables: definition.environment_variables.clone(),
            secrets_manager: definition.secrets.clone(),
        });
    }

    if !definition.cache_paths.is_empty() {
        spec.cache = Some(CacheSection {
            paths: definition.cache_paths.clone(),
        });
    }

    spec.reports = definition.reports.clone();

    spec
}

fn render_bucket(
    definition: &PipelineDefinition,
    index: &HashMap<&str, &Block>,
    group: BlockGroup,
    style: &BucketStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    for block in definition.blocks.iter().filter(|block| block.group == group) {
        render_block(block, index, style, &mut lines);
    }
    lines
}

fn render_block(
    block: &Block,
    index: &HashMap<&str, &Block>,
    style: &BucketStyle,
    out: &mut Vec<String>,
) {
    let own = resolve_commands(block);

    // Package-manager blocks never get the conditional wrapper: a failed
    // install fails the phase outright.
    match &block.on_failed {
        Some(fallback_id) if !block.block_type.is_package_manager() => {
            out.push(format!("# {}: {} (with fallback)", style.comment, block.id));
            out.push("if".to_string());
            out.extend(own.iter().map(|command| format!("  {command}")));
            out.push("then".to_string());
            out.push(format!("echo \"{} {} succeeded\"", style.label, block.id));
            if let Some(success_id) = &block.on_success {
                out.extend(
                    referenced_commands(index, &block.id, success_id)
                        .iter()
                        .map(|command| format!("  {command}")),
                );
            }
            out.push("else".to_string());
            out.push(format!(
                "echo \"{} {} failed, running fallback\"",
                style.label, block.id
            ));
            out.extend(
                referenced_commands(index, &block.id, fallback_id)
                    .iter()
                    .map(|command| format!("  {command}")),
            );
            out.push("fi".to_string());
        }
        _ => {
            out.push(format!("# {}: {}", style.comment, block.id));
            if block.block_type.is_package_manager() {
                out.push("# Package manager - fail fast on error".to_string());
            }
            out.extend(own);
        }
    }
}

/// Commands of a referenced block, expanded one level only: a fallback
/// block's own `on_failed` pointer is not followed.
fn referenced_commands(
    index: &HashMap<&str, &Block>,
    referrer: &str,
    target: &str,
) -> Vec<String> {
    match index.get(target) {
        Some(block) => resolve_commands(block),
        None => {
            tracing::debug!(
                block = referrer,
                target,
                "fallback reference does not resolve; inlining no commands"
            );
            Vec::new()
        }
    }
}
