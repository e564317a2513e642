//! Tree builder turning a parsed document into a configuration tree.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{ConfigTree, NodeData};
use crate::domain::document::{Content, Element};
use crate::domain::error::DomainResult;
use crate::domain::substitution::Expander;

/// Result type for tree operations.
pub type TreeResult<T> = DomainResult<T>;

/// Constructs a [`ConfigTree`] isomorphic to one parsed document.
pub struct TreeBuilder<'e> {
    env_expansion: Option<EnvExpansion<'e>>,
}

struct EnvExpansion<'e> {
    expander: Expander,
    lookup: Box<dyn Fn(&str) -> Option<String> + 'e>,
}

impl Default for TreeBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'e> TreeBuilder<'e> {
    pub fn new() -> Self {
        Self {
            env_expansion: None,
        }
    }

    /// Expand environment references in leaf values while building.
    ///
    /// Path references are left for query time. An unmatched delimiter or an
    /// unknown environment name fails the build.
    pub fn with_env_expansion<F>(mut self, expander: Expander, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'e,
    {
        self.env_expansion = Some(EnvExpansion {
            expander,
            lookup: Box::new(lookup),
        });
        self
    }

    #[instrument(level = "debug", skip(self, document), fields(root = %document.name))]
    pub fn build(&self, document: &Element) -> TreeResult<ConfigTree> {
        let mut tree = ConfigTree::new();
        self.build_node(&mut tree, document, None)?;
        debug!("build: {} nodes from <{}>", tree.len(), document.name);
        Ok(tree)
    }

    fn build_node(
        &self,
        tree: &mut ConfigTree,
        element: &Element,
        parent: Option<Index>,
    ) -> TreeResult<Index> {
        if element.has_element_children() {
            let idx = tree.insert_node(NodeData::branch(&element.name), parent);
            for child in element.element_children() {
                self.build_node(tree, child, Some(idx))?;
            }
            Ok(idx)
        } else {
            let value = self.leaf_value(element)?;
            Ok(tree.insert_node(NodeData::leaf(&element.name, value), parent))
        }
    }

    fn leaf_value(&self, element: &Element) -> TreeResult<String> {
        let text = leaf_text(element);
        match &self.env_expansion {
            Some(env) => env.expander.expand_env_only(&text, &env.lookup),
            None => Ok(text),
        }
    }
}

/// Text of an element without element children.
///
/// A character data section wins over surrounding plain text, so literal
/// markup can be embedded in a value.
fn leaf_text(element: &Element) -> String {
    let cdata = element.content.iter().find_map(|c| match c {
        Content::CData(text) => Some(text.as_str()),
        _ => None,
    });
    if let Some(text) = cdata {
        return text.trim().to_string();
    }

    let text: String = element
        .content
        .iter()
        .filter_map(|c| match c {
            Content::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    text.trim().to_string()
}
