//! Parsed document shape consumed by the tree builder.
//!
//! A parser turns markup into this element tree; the domain layer never sees
//! raw markup.

/// A node of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
    /// Character data section, taken literally.
    CData(String),
    Comment(String),
}

/// A named element with its ordered content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    /// Attributes in document order; not part of the configuration tree.
    pub attributes: Vec<(String, String)>,
    pub content: Vec<Content>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Builder-style helper for tests and synthetic documents.
    pub fn with_child(mut self, child: Element) -> Self {
        self.content.push(Content::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(Content::Text(text.into()));
        self
    }

    pub fn with_cdata(mut self, text: impl Into<String>) -> Self {
        self.content.push(Content::CData(text.into()));
        self
    }

    /// Leaf element holding only text.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.element_children().next().is_some()
    }
}
