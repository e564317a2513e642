//! Folding independently built document trees into one tree.
//!
//! Documents are merged in the given order under a synthetic root:
//! - a node whose name is not yet present among the target's children is appended
//! - a matching leaf is overwritten by an incoming leaf
//! - a matching leaf adopts the children of an incoming branch (its value is dropped)
//! - a matching branch receives the incoming children recursively
//!
//! Only the first same-named child of the target is ever matched.

use std::fmt;
use std::str::FromStr;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::arena::{ConfigTree, ROOT_NAME};

/// How document trees are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Overlay later documents onto earlier ones.
    #[default]
    Merge,
    /// Keep every document as a separate child of the root.
    Append,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Merge => write!(f, "merge"),
            MergeMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMode::Merge),
            "append" => Ok(MergeMode::Append),
            other => Err(format!("unknown merge mode: {other}")),
        }
    }
}

/// Combine `trees` in order under a synthetic `root` node.
#[instrument(level = "debug", skip(trees), fields(count = trees.len()))]
pub fn merge_trees(trees: &[ConfigTree], mode: MergeMode) -> ConfigTree {
    let mut merged = ConfigTree::with_root(ROOT_NAME);
    let Some(root) = merged.root() else {
        return merged;
    };

    for tree in trees {
        let Some(top) = tree.root() else {
            continue;
        };
        match mode {
            MergeMode::Merge => merge_into(&mut merged, root, tree, top),
            MergeMode::Append => {
                merged.graft(root, tree, top);
            }
        }
    }
    debug!("merge_trees: {} nodes after {} mode", merged.len(), mode);
    merged
}

/// Merge the subtree `orphan` of `source` into `parent` of `target`.
pub fn merge_into(target: &mut ConfigTree, parent: Index, source: &ConfigTree, orphan: Index) {
    let Some(orphan_node) = source.get_node(orphan) else {
        return;
    };
    let name = orphan_node.data.name.as_str();

    let matched = target
        .children(parent)
        .iter()
        .copied()
        .find(|&child| target.name(child) == Some(name));

    let Some(matched) = matched else {
        trace!("merge: append {}", name);
        target.graft(parent, source, orphan);
        return;
    };

    if !target.has_children(matched) {
        if orphan_node.children.is_empty() {
            trace!("merge: override leaf {}", name);
            target.set_value(matched, orphan_node.data.value.clone());
        } else {
            trace!("merge: promote leaf {} to branch", name);
            target.set_value(matched, None);
            for &child in &orphan_node.children {
                target.graft(matched, source, child);
            }
        }
    } else {
        for &child in &orphan_node.children {
            merge_into(target, matched, source, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::NodeData;

    fn doc(build: impl FnOnce(&mut ConfigTree, Index)) -> ConfigTree {
        let mut tree = ConfigTree::with_root("config");
        let root = tree.root().unwrap();
        build(&mut tree, root);
        tree
    }

    fn find(tree: &ConfigTree, parent: Index, name: &str) -> Vec<Index> {
        tree.children(parent)
            .iter()
            .copied()
            .filter(|&c| tree.name(c) == Some(name))
            .collect()
    }

    fn config(tree: &ConfigTree) -> Index {
        find(tree, tree.root().unwrap(), "config")[0]
    }

    #[test]
    fn given_same_leaf_when_merging_then_last_document_wins() {
        let d1 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("p", "one"));
        });
        let d2 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("p", "two"));
        });

        let merged = merge_trees(&[d1.clone(), d2.clone()], MergeMode::Merge);
        let p = find(&merged, config(&merged), "p");
        assert_eq!(p.len(), 1);
        assert_eq!(merged.value(p[0]), Some("two"));

        let merged = merge_trees(&[d2, d1], MergeMode::Merge);
        let p = find(&merged, config(&merged), "p")[0];
        assert_eq!(merged.value(p), Some("one"));
    }

    #[test]
    fn given_same_branch_when_merging_then_children_accrete() {
        let d1 = doc(|t, r| {
            let a = t.append_child(r, NodeData::branch("a"));
            t.append_child(a, NodeData::leaf("b", "1"));
        });
        let d2 = doc(|t, r| {
            let a = t.append_child(r, NodeData::branch("a"));
            t.append_child(a, NodeData::leaf("c", "2"));
        });

        let merged = merge_trees(&[d1, d2], MergeMode::Merge);
        let a = find(&merged, config(&merged), "a");
        assert_eq!(a.len(), 1);
        let names: Vec<_> = merged
            .children(a[0])
            .iter()
            .filter_map(|&c| merged.name(c))
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn given_leaf_then_branch_when_merging_then_promoted() {
        let d1 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("a", "v"));
        });
        let d2 = doc(|t, r| {
            let a = t.append_child(r, NodeData::branch("a"));
            t.append_child(a, NodeData::leaf("x", "1"));
            t.append_child(a, NodeData::leaf("y", "2"));
        });

        let merged = merge_trees(&[d1, d2], MergeMode::Merge);
        let a = find(&merged, config(&merged), "a")[0];
        assert_eq!(merged.value(a), None);
        let names: Vec<_> = merged
            .children(a)
            .iter()
            .filter_map(|&c| merged.name(c))
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(merged.parent(merged.children(a)[0]), Some(a));
    }

    #[test]
    fn given_duplicate_siblings_when_merging_then_first_match_updated() {
        let d1 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("e", "1"));
            t.append_child(r, NodeData::leaf("e", "2"));
        });
        let d2 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("e", "override"));
        });

        let merged = merge_trees(&[d1, d2], MergeMode::Merge);
        let values: Vec<_> = find(&merged, config(&merged), "e")
            .into_iter()
            .filter_map(|i| merged.value(i))
            .collect();
        assert_eq!(values, vec!["override", "2"]);
    }

    #[test]
    fn given_append_mode_when_merging_then_documents_kept_apart() {
        let d1 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("p", "one"));
        });
        let d2 = doc(|t, r| {
            t.append_child(r, NodeData::leaf("p", "two"));
        });

        let merged = merge_trees(&[d1, d2], MergeMode::Append);
        assert_eq!(find(&merged, merged.root().unwrap(), "config").len(), 2);
        assert_eq!(merged.name(merged.root().unwrap()), Some(ROOT_NAME));
    }

    #[test]
    fn given_mode_names_when_parsing_then_recognized() {
        assert_eq!("merge".parse::<MergeMode>(), Ok(MergeMode::Merge));
        assert_eq!("APPEND".parse::<MergeMode>(), Ok(MergeMode::Append));
        assert!("zip".parse::<MergeMode>().is_err());
    }
}
