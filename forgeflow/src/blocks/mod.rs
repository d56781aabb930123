//! Block model for the block-based pipeline editor.
//!
//! A [`Block`] is one step of a stored pipeline definition. Its
//! [`BlockGroup`] decides which build phase the block's commands land in;
//! its [`BlockType`] decides how commands are synthesized (see
//! [`resolver::resolve_commands`]).

mod resolver;

pub use resolver::resolve_commands;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of work a block performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    /// Installs OS-level packages (apt, apt-get, yum, ...).
    OsPackageManager,
    /// Installs Node packages (npm, yarn, pnpm, ...).
    NodePackageManager,
    /// Runs a literal list of build commands.
    CustomBuildCommand,
    /// Runs a Node test runner invocation.
    NodeTestCommand,
    /// Runs a literal list of test commands.
    CustomTestCommand,
    /// Runs a literal list of run/launch commands.
    CustomRunCommand,
    /// Any type this crate does not recognize. Documents written by newer
    /// editors still deserialize; the resolver yields no commands for it.
    #[serde(other)]
    Unknown,
}

impl BlockType {
    /// Returns true for the package-manager block types.
    ///
    /// Package-manager blocks never get a conditional fallback wrapper:
    /// a failed install must fail the phase outright.
    #[must_use]
    pub fn is_package_manager(self) -> bool {
        matches!(self, Self::OsPackageManager | Self::NodePackageManager)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OsPackageManager => write!(f, "OS_PACKAGE_MANAGER"),
            Self::NodePackageManager => write!(f, "NODE_PACKAGE_MANAGER"),
            Self::CustomBuildCommand => write!(f, "CUSTOM_BUILD_COMMAND"),
            Self::NodeTestCommand => write!(f, "NODE_TEST_COMMAND"),
            Self::CustomTestCommand => write!(f, "CUSTOM_TEST_COMMAND"),
            Self::CustomRunCommand => write!(f, "CUSTOM_RUN_COMMAND"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// The phase group a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockGroup {
    /// Lands in `phases.pre_build`.
    Custom,
    /// Lands in `phases.build`.
    Build,
    /// Lands in `phases.post_build`, before any RUN commands.
    Test,
    /// Appended to the end of `phases.post_build`.
    Run,
}

impl fmt::Display for BlockGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => write!(f, "CUSTOM"),
            Self::Build => write!(f, "BUILD"),
            Self::Test => write!(f, "TEST"),
            Self::Run => write!(f, "RUN"),
        }
    }
}

/// One step in a block-based pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unique id within one definition.
    pub id: String,
    /// The block type.
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// The phase group.
    pub group: BlockGroup,
    /// Id of a block whose commands are inlined into the success branch
    /// when this block runs under a conditional wrapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    /// Id of a block whose commands are inlined into the failure branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failed: Option<String>,
    /// Package manager name, for package-manager block types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    /// Packages to install, for package-manager block types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    /// Literal command lines, for custom/test/run block types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

impl Block {
    /// Creates a new block with no payload.
    #[must_use]
    pub fn new(id: impl Into<String>, block_type: BlockType, group: BlockGroup) -> Self {
        Self {
            id: id.into(),
            block_type,
            group,
            on_success: None,
            on_failed: None,
            manager: None,
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Sets the package manager name.
    #[must_use]
    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    /// Sets the package list.
    #[must_use]
    pub fn with_packages(mut self, packages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the literal command lines.
    #[must_use]
    pub fn with_commands(mut self, commands: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the success follow-on reference.
    #[must_use]
    pub fn with_on_success(mut self, target: impl Into<String>) -> Self {
        self.on_success = Some(target.into());
        self
    }

    /// Sets the failure fallback reference.
    #[must_use]
    pub fn with_on_failed(mut self, target: impl Into<String>) -> Self {
        self.on_failed = Some(target.into());
        self
    }
}
