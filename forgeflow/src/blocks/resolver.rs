//! Resolves a block into the literal command lines it contributes.

use super::{Block, BlockType};

/// Returns the shell command lines a single block contributes.
///
/// Pure and total: never fails, never touches anything outside the block.
/// Unknown or underspecified blocks degrade to an empty command list with
/// a log line rather than an error; the authoring-time validation pass is
/// the place where such gaps surface to users.
#[must_use]
pub fn resolve_commands(block: &Block) -> Vec<String> {
    match block.block_type {
        BlockType::OsPackageManager => {
            let Some(manager) = block.manager.as_deref() else {
                tracing::warn!(block = %block.id, "OS package block has no manager; yielding no commands");
                return Vec::new();
            };
            if block.packages.is_empty() {
                return vec![format!("{manager} update -y")];
            }
            let mut commands = Vec::new();
            if matches!(manager, "apt" | "apt-get") {
                commands.push(format!("{manager} update -y"));
            }
            commands.push(format!("{manager} install -y {}", block.packages.join(" ")));
            commands
        }
        BlockType::NodePackageManager => {
            let Some(manager) = block.manager.as_deref() else {
                tracing::warn!(block = %block.id, "node package block has no manager; yielding no commands");
                return Vec::new();
            };
            if block.packages.is_empty() {
                // Install from the project manifest.
                vec![format!("{manager} install")]
            } else {
                vec![format!("{manager} install {}", block.packages.join(" "))]
            }
        }
        BlockType::CustomBuildCommand
        | BlockType::NodeTestCommand
        | BlockType::CustomTestCommand
        | BlockType::CustomRunCommand => block.commands.clone(),
        BlockType::Unknown => {
            tracing::warn!(block = %block.id, "unknown block type; yielding no commands");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockGroup;
    use pretty_assertions::assert_eq;

    fn os_block(manager: &str, packages: &[&str]) -> Block {
        Block::new("os", BlockType::OsPackageManager, BlockGroup::Custom)
            .with_manager(manager)
            .with_packages(packages.iter().copied())
    }

    #[test]
    fn apt_get_prepends_update() {
        let commands = resolve_commands(&os_block("apt-get", &["curl", "git"]));
        assert_eq!(
            commands,
            vec![
                "apt-get update -y".to_string(),
                "apt-get install -y curl git".to_string(),
            ]
        );
    }

    #[test]
    fn apt_prepends_update_too() {
        let commands = resolve_commands(&os_block("apt", &["jq"]));
        assert_eq!(
            commands,
            vec!["apt update -y".to_string(), "apt install -y jq".to_string()]
        );
    }

    #[test]
    fn yum_installs_without_update() {
        let commands = resolve_commands(&os_block("yum", &["make"]));
        assert_eq!(commands, vec!["yum install -y make".to_string()]);
    }

    #[test]
    fn os_block_with_no_packages_updates_only() {
        let commands = resolve_commands(&os_block("apt-get", &[]));
        assert_eq!(commands, vec!["apt-get update -y".to_string()]);
    }

    #[test]
    fn npm_with_no_packages_installs_from_manifest() {
        let block = Block::new("deps", BlockType::NodePackageManager, BlockGroup::Custom)
            .with_manager("npm");
        assert_eq!(resolve_commands(&block), vec!["npm install".to_string()]);
    }

    #[test]
    fn yarn_with_packages() {
        let block = Block::new("deps", BlockType::NodePackageManager, BlockGroup::Custom)
            .with_manager("yarn")
            .with_packages(["react", "react-dom"]);
        assert_eq!(
            resolve_commands(&block),
            vec!["yarn install react react-dom".to_string()]
        );
    }

    #[test]
    fn custom_commands_pass_through_in_order() {
        let block = Block::new("build", BlockType::CustomBuildCommand, BlockGroup::Build)
            .with_commands(["make clean", "make all"]);
        assert_eq!(
            resolve_commands(&block),
            vec!["make clean".to_string(), "make all".to_string()]
        );
    }

    #[test]
    fn node_test_commands_pass_through() {
        let block = Block::new("tests", BlockType::NodeTestCommand, BlockGroup::Test)
            .with_commands(["npm test"]);
        assert_eq!(resolve_commands(&block), vec!["npm test".to_string()]);
    }

    #[test]
    fn unknown_type_yields_nothing() {
        let block = Block::new("odd", BlockType::Unknown, BlockGroup::Build);
        assert!(resolve_commands(&block).is_empty());
    }

    #[test]
    fn missing_manager_yields_nothing() {
        let block = Block::new("os", BlockType::OsPackageManager, BlockGroup::Custom)
            .with_packages(["curl"]);
        assert!(resolve_commands(&block).is_empty());
    }
}
