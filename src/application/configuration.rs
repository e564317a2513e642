//! One loaded configuration: the merged tree plus query operations.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use generational_arena::Index;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::path::{resolve, single_value};
use crate::domain::{
    format_message, ConfigTree, DomainError, DomainResult, Expander, NodeRef, ReferenceResolver,
};
use crate::infrastructure::traits::Environment;

/// Immutable view over one merged configuration tree.
pub struct Configuration {
    tree: ConfigTree,
    expander: Expander,
    env: Arc<dyn Environment>,
    sources: Vec<PathBuf>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("nodes", &self.tree.len())
            .field("expander", &self.expander)
            .field("sources", &self.sources)
            .finish()
    }
}

impl Configuration {
    pub fn new(tree: ConfigTree, expander: Expander, env: Arc<dyn Environment>) -> Self {
        Self {
            tree,
            expander,
            env,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Documents this configuration was merged from, in merge order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    fn start(&self) -> Option<Index> {
        self.tree.root()
    }

    /// Every node at `path`, in tree order.
    pub fn nodes(&self, path: &str) -> DomainResult<Vec<NodeRef<'_>>> {
        let Some(start) = self.start() else {
            return Ok(Vec::new());
        };
        Ok(resolve(&self.tree, start, path)?
            .into_iter()
            .filter_map(|idx| self.tree.node(idx))
            .collect())
    }

    /// Unexpanded value of the single node at `path`.
    pub fn raw_value(&self, path: &str) -> DomainResult<String> {
        self.resolve_path(path)?
            .ok_or_else(|| DomainError::missing(path))
    }

    /// Fully expanded value of the single node at `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn value(&self, path: &str) -> DomainResult<String> {
        self.expander.expand_path(path, self)
    }

    /// Expanded value with numbered placeholders filled from `args`.
    pub fn value_with_args<S: AsRef<str>>(&self, path: &str, args: &[S]) -> DomainResult<String> {
        let expanded = self.value(path)?;
        Ok(format_message(&expanded, args))
    }

    /// Like [`Configuration::value`], but an unresolvable reference yields `None`.
    ///
    /// Malformed values and cycles are still errors.
    pub fn try_value(&self, path: &str) -> DomainResult<Option<String>> {
        absent_if_missing(self.value(path))
    }

    /// Expanded value parsed into `T`.
    pub fn get_as<T: FromStr>(&self, path: &str) -> DomainResult<T> {
        let value = self.value(path)?;
        value.trim().parse::<T>().map_err(|_| DomainError::Coercion {
            path: path.to_string(),
            value,
            target: std::any::type_name::<T>(),
        })
    }

    /// Expanded value read as a flag (`true/false`, `yes/no`, `on/off`, `1/0`).
    pub fn get_bool(&self, path: &str) -> DomainResult<bool> {
        let value = self.value(path)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(DomainError::Coercion {
                path: path.to_string(),
                value,
                target: "bool",
            }),
        }
    }

    /// Expand references in arbitrary text against this configuration.
    pub fn expand(&self, raw: &str) -> DomainResult<String> {
        self.expander.expand(raw, self)
    }

    /// Every leaf as `(path, raw value)`, in tree order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.tree.leaf_entries()
    }

    /// Render the merged tree for display.
    pub fn to_tree(&self) -> Tree<String> {
        match self.start() {
            Some(root) => self.build_display(root),
            None => Tree::new("Empty tree".to_string()),
        }
    }

    fn build_display(&self, idx: Index) -> Tree<String> {
        let label = self
            .tree
            .node(idx)
            .map(|n| match n.value() {
                Some(v) if !n.has_children() => format!("{} = {}", n.name(), v),
                _ => n.name().to_string(),
            })
            .unwrap_or_default();
        let leaves: Vec<_> = self
            .tree
            .children(idx)
            .iter()
            .map(|&child| self.build_display(child))
            .collect();
        Tree::new(label).with_leaves(leaves)
    }
}

impl ReferenceResolver for Configuration {
    fn resolve_path(&self, path: &str) -> DomainResult<Option<String>> {
        let Some(start) = self.start() else {
            return Ok(None);
        };
        single_value(&self.tree, start, path)
    }

    fn resolve_env(&self, name: &str) -> Option<String> {
        let value = self.env.var(name);
        debug!("resolve_env: {} found={}", name, value.is_some());
        value
    }
}

fn absent_if_missing(result: DomainResult<String>) -> DomainResult<Option<String>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_missing() => Ok(None),
        Err(e) => Err(e),
    }
}
