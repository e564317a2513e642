//! Path queries over a configuration tree.
//!
//! A path is a `/`-separated list of node names without a leading `/`.
//! Every segment matches all same-named siblings, and resolution continues
//! independently below each match.

use generational_arena::Index;
use tracing::trace;

use crate::domain::arena::ConfigTree;
use crate::domain::error::{DomainError, DomainResult};

pub const PATH_SEPARATOR: char = '/';

/// All nodes reachable from `start` by following `path`, in tree order.
///
/// An empty path yields no nodes. A path starting with `/` is rejected.
pub fn resolve(tree: &ConfigTree, start: Index, path: &str) -> DomainResult<Vec<Index>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    if path.starts_with(PATH_SEPARATOR) {
        return Err(DomainError::InvalidPath {
            path: path.to_string(),
        });
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let mut results = Vec::new();
    collect(tree, start, &segments, &mut results);
    trace!("resolve: {} -> {} nodes", path, results.len());
    Ok(results)
}

fn collect(tree: &ConfigTree, node: Index, segments: &[&str], results: &mut Vec<Index>) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    for &child in tree.children(node) {
        if tree.name(child) != Some(*segment) {
            continue;
        }
        if rest.is_empty() {
            results.push(child);
        } else if tree.has_children(child) {
            collect(tree, child, rest, results);
        }
    }
}

/// Value of the single node at `path`.
///
/// Zero matches, several matches, and a unique interior node all yield `None`.
pub fn single_value(tree: &ConfigTree, start: Index, path: &str) -> DomainResult<Option<String>> {
    let matches = resolve(tree, start, path)?;
    match matches.as_slice() {
        [only] => Ok(tree.value(*only).map(str::to_string)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::{NodeData, ROOT_NAME};

    fn tree() -> ConfigTree {
        let mut tree = ConfigTree::with_root(ROOT_NAME);
        let root = tree.root().unwrap();
        let list = tree.append_child(root, NodeData::branch("list"));
        for v in ["1", "2", "3"] {
            tree.append_child(list, NodeData::leaf("e", v));
        }
        let a1 = tree.append_child(root, NodeData::branch("a"));
        tree.append_child(a1, NodeData::leaf("b", "first"));
        let a2 = tree.append_child(root, NodeData::branch("a"));
        tree.append_child(a2, NodeData::leaf("b", "second"));
        tree.append_child(root, NodeData::leaf("a", "leaf"));
        tree
    }

    fn values(tree: &ConfigTree, path: &str) -> Vec<String> {
        resolve(tree, tree.root().unwrap(), path)
            .unwrap()
            .into_iter()
            .filter_map(|i| tree.value(i).map(str::to_string))
            .collect()
    }

    #[test]
    fn given_same_named_siblings_when_resolving_then_all_returned() {
        assert_eq!(values(&tree(), "list/e"), vec!["1", "2", "3"]);
    }

    #[test]
    fn given_duplicate_branches_when_resolving_then_descends_each() {
        assert_eq!(values(&tree(), "a/b"), vec!["first", "second"]);
    }

    #[test]
    fn given_unknown_segment_when_resolving_then_empty() {
        let t = tree();
        assert!(resolve(&t, t.root().unwrap(), "list/x").unwrap().is_empty());
        assert!(resolve(&t, t.root().unwrap(), "nope/e").unwrap().is_empty());
    }

    #[test]
    fn given_leaf_on_inner_segment_when_resolving_then_skipped() {
        let t = tree();
        assert!(resolve(&t, t.root().unwrap(), "list/e/deeper")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn given_empty_path_when_resolving_then_empty() {
        let t = tree();
        assert!(resolve(&t, t.root().unwrap(), "").unwrap().is_empty());
    }

    #[test]
    fn given_leading_separator_when_resolving_then_invalid_path() {
        let t = tree();
        let err = resolve(&t, t.root().unwrap(), "/list/e").unwrap_err();
        assert!(matches!(err, DomainError::InvalidPath { .. }));
    }

    #[test]
    fn given_unique_or_ambiguous_path_when_single_value_then_only_unique_found() {
        let t = tree();
        let root = t.root().unwrap();
        assert_eq!(single_value(&t, root, "list/e").unwrap(), None);
        assert_eq!(single_value(&t, root, "missing").unwrap(), None);
        assert_eq!(single_value(&t, root, "list").unwrap(), None);

        let mut t2 = ConfigTree::with_root(ROOT_NAME);
        let r2 = t2.root().unwrap();
        t2.append_child(r2, NodeData::leaf("k", "v"));
        assert_eq!(single_value(&t2, r2, "k").unwrap(), Some("v".to_string()));
    }
}
