use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

/// Name of the synthetic node that holds all merged documents.
pub const ROOT_NAME: &str = "root";

/// Data payload of a configuration node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Element name, not unique among siblings
    pub name: String,
    /// Text payload; `None` for interior nodes
    pub value: Option<String>,
}

impl NodeData {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} = {}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tree node in the arena-based configuration tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes, in insertion order
    pub children: Vec<Index>,
}

/// Arena-based configuration tree.
///
/// The arena owns every node; parent links are plain indices, so upward
/// traversal never keeps a node alive.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    arena: Arena<TreeNode>,
    root: Option<Index>,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Tree holding a single interior root node.
    pub fn with_root(name: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.insert_node(NodeData::branch(name), None);
        tree
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    /// Attach a new child under `parent`. Duplicate names are kept.
    pub fn append_child(&mut self, parent: Index, data: NodeData) -> Index {
        self.insert_node(data, Some(parent))
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn node(&self, idx: Index) -> Option<NodeRef<'_>> {
        self.arena.get(idx).map(|_| NodeRef { tree: self, idx })
    }

    pub fn root_node(&self) -> Option<NodeRef<'_>> {
        self.root.and_then(|idx| self.node(idx))
    }

    pub fn name(&self, idx: Index) -> Option<&str> {
        self.get_node(idx).map(|n| n.data.name.as_str())
    }

    pub fn value(&self, idx: Index) -> Option<&str> {
        self.get_node(idx).and_then(|n| n.data.value.as_deref())
    }

    pub fn set_value(&mut self, idx: Index, value: Option<String>) {
        if let Some(node) = self.get_node_mut(idx) {
            node.data.value = value;
        }
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.get_node(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.get_node(idx).and_then(|n| n.parent)
    }

    pub fn has_children(&self, idx: Index) -> bool {
        !self.children(idx).is_empty()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Deep-copy the subtree at `source_idx` of `source` under `parent`.
    ///
    /// Returns the index of the copied subtree root in `self`.
    #[instrument(level = "trace", skip(self, source))]
    pub fn graft(&mut self, parent: Index, source: &ConfigTree, source_idx: Index) -> Option<Index> {
        let node = source.get_node(source_idx)?;
        let new_idx = self.append_child(parent, node.data.clone());
        for &child in &node.children {
            self.graft(new_idx, source, child);
        }
        Some(new_idx)
    }

    /// Pre-order, left-to-right traversal starting at the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        1 + self
            .children(node_idx)
            .iter()
            .map(|&child| self.calculate_depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Slash-joined names from the root's children down to `idx`.
    ///
    /// The root itself is not part of the path, matching the query syntax.
    pub fn path_of(&self, idx: Index) -> String {
        let mut names = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let parent = self.parent(i);
            if parent.is_some() {
                if let Some(name) = self.name(i) {
                    names.push(name);
                }
            }
            current = parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Collects all leaf nodes as `(path, value)` pairs in traversal order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_entries(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|(idx, node)| node.children.is_empty() && Some(*idx) != self.root)
            .map(|(idx, node)| {
                (
                    self.path_of(idx),
                    node.data.value.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Structural equality of two subtrees, children compared order-independently.
    pub fn subtree_eq(&self, a: Index, other: &ConfigTree, b: Index) -> bool {
        let (Some(left), Some(right)) = (self.get_node(a), other.get_node(b)) else {
            return false;
        };
        if left.data != right.data || left.children.len() != right.children.len() {
            return false;
        }
        left.children.iter().all(|&lc| {
            right
                .children
                .iter()
                .any(|&rc| self.subtree_eq(lc, other, rc))
        })
    }
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (Some(a), Some(b)) => self.subtree_eq(a, other, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Borrowed handle to one node of a [`ConfigTree`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a ConfigTree,
    idx: Index,
}

impl<'a> NodeRef<'a> {
    pub fn index(&self) -> Index {
        self.idx
    }

    pub fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    pub fn name(&self) -> &'a str {
        self.tree.name(self.idx).unwrap_or_default()
    }

    pub fn value(&self) -> Option<&'a str> {
        self.tree.value(self.idx)
    }

    pub fn has_children(&self) -> bool {
        self.tree.has_children(self.idx)
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.idx)
            .iter()
            .map(move |&idx| NodeRef { tree, idx })
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree
            .parent(self.idx)
            .map(|idx| NodeRef { tree: self.tree, idx })
    }

    pub fn path(&self) -> String {
        self.tree.path_of(self.idx)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tree.subtree_eq(self.idx, other.tree, other.idx)
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.get_node(self.idx) {
            Some(node) if node.children.is_empty() => write!(f, "{}", node.data),
            Some(node) => write!(f, "{}/", node.data.name),
            None => Ok(()),
        }
    }
}

pub struct TreeIterator<'a> {
    tree: &'a ConfigTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a ConfigTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.tree.get_node(current_idx)?;
        // Push children in reverse order for left-to-right traversal
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some((current_idx, node))
    }
}
