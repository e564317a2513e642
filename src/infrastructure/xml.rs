//! XML document parser built on quick-xml.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::domain::{Content, Element};
use crate::infrastructure::error::DocumentError;
use crate::infrastructure::traits::DocumentParser;

/// Parses XML text into an [`Element`] tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlDocumentParser;

impl XmlDocumentParser {
    pub fn new() -> Self {
        Self
    }
}

fn syntax(reader: &Reader<&[u8]>, message: impl ToString) -> DocumentError {
    DocumentError::Syntax {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}

fn start_element(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(reader, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| syntax(reader, e))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

/// Attach a finished element to its parent, or make it the root.
fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocumentError> {
    if let Some(parent) = stack.last_mut() {
        parent.content.push(Content::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocumentError::MultipleRoots(element.name));
    }
    *root = Some(element);
    Ok(())
}

impl DocumentParser for XmlDocumentParser {
    fn parse(&self, content: &str) -> Result<Element, DocumentError> {
        let mut reader = Reader::from_str(content);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| syntax(&reader, e))?;
            match event {
                Event::Start(start) => {
                    let element = start_element(&reader, &start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = start_element(&reader, &start)?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| syntax(&reader, "unexpected closing tag"))?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| syntax(&reader, e))?;
                    match stack.last_mut() {
                        Some(current) => current.content.push(Content::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => return Err(syntax(&reader, "text outside of root element")),
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    if let Some(current) = stack.last_mut() {
                        current.content.push(Content::CData(text));
                    }
                }
                Event::Comment(comment) => {
                    let text = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                    if let Some(current) = stack.last_mut() {
                        current.content.push(Content::Comment(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::Unclosed(open.name));
        }
        let root = root.ok_or(DocumentError::NoRoot)?;
        trace!("parse: root element <{}>", root.name);
        Ok(root)
    }

    /// Only the root element is checked: when the schema declares top-level
    /// elements, the document root must be one of them.
    fn validate(&self, document: &Element, schema: &str) -> Result<(), DocumentError> {
        let schema = self.parse(schema)?;
        let declared: Vec<&str> = schema
            .element_children()
            .filter(|e| e.local_name() == "element")
            .filter_map(|e| e.attribute("name"))
            .collect();

        if declared.is_empty() || declared.contains(&document.name.as_str()) {
            return Ok(());
        }
        Err(DocumentError::Schema {
            root: document.name.clone(),
            expected: declared.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Element, DocumentError> {
        XmlDocumentParser.parse(content)
    }

    #[test]
    fn given_nested_document_when_parsing_then_elements_in_order() {
        let root = parse(
            r#"<?xml version="1.0"?>
<config>
  <!-- database -->
  <db host="ignored">
    <host>localhost</host>
    <port>5432</port>
  </db>
  <flag/>
</config>"#,
        )
        .unwrap();

        assert_eq!(root.name, "config");
        let names: Vec<_> = root.element_children().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["db", "flag"]);

        let db = root.element_children().next().unwrap();
        assert_eq!(db.attribute("host"), Some("ignored"));
        let host = db.element_children().next().unwrap();
        assert_eq!(host.content, vec![Content::Text("localhost".into())]);
    }

    #[test]
    fn given_entities_and_cdata_when_parsing_then_decoded() {
        let root = parse("<v>a &amp; b<![CDATA[<raw>]]></v>").unwrap();
        assert_eq!(
            root.content,
            vec![Content::Text("a & b".into()), Content::CData("<raw>".into())]
        );
    }

    #[test]
    fn given_mismatched_tags_when_parsing_then_syntax_error() {
        assert!(matches!(
            parse("<a><b></a>"),
            Err(DocumentError::Syntax { .. })
        ));
    }

    #[test]
    fn given_unclosed_root_when_parsing_then_error() {
        assert!(parse("<a><b/>").is_err());
    }

    #[test]
    fn given_empty_input_when_parsing_then_no_root() {
        assert_eq!(parse("  "), Err(DocumentError::NoRoot));
    }

    #[test]
    fn given_two_roots_when_parsing_then_error() {
        assert_eq!(
            parse("<a/><b/>"),
            Err(DocumentError::MultipleRoots("b".into()))
        );
    }

    #[test]
    fn given_schema_declaring_root_when_validating_then_accepts_only_declared() {
        let schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="config"/>
</xs:schema>"#;
        let parser = XmlDocumentParser;
        assert!(parser.validate(&Element::new("config"), schema).is_ok());
        assert!(matches!(
            parser.validate(&Element::new("other"), schema),
            Err(DocumentError::Schema { .. })
        ));
    }

    #[test]
    fn given_malformed_schema_when_validating_then_error() {
        let result = XmlDocumentParser.validate(&Element::new("config"), "<xs:schema>");
        assert!(result.is_err());
    }
}
