//! Domain layer: configuration tree, merge, path queries and value expansion
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod document;
pub mod error;
pub mod merge;
pub mod path;
pub mod substitution;

pub use arena::{ConfigTree, NodeData, NodeRef, TreeNode, ROOT_NAME};
pub use builder::TreeBuilder;
pub use document::{Content, Element};
pub use error::{DomainError, DomainResult};
pub use merge::{merge_trees, MergeMode};
pub use substitution::{format_message, Expander, ReferenceResolver};

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
///
/// Uses shellexpand; undefined variables leave the input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
