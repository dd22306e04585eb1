//! SdfDocument - parsed SDF or URDF document and its canonical text form
//!

use crate::error::FilterError;
use std::io::Write;
use xmltree::{Element, XMLNode};

/// Input format of a document, detected from its root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `<sdf version="...">` root
    Sdf,
    /// `<robot name="...">` root
    Urdf,
}

impl DocumentFormat {
    /// Detect the format from the root element name.
    pub fn detect(root: &Element) -> Result<Self, FilterError> {
        match root.name.as_str() {
            "sdf" => Ok(DocumentFormat::Sdf),
            "robot" => Ok(DocumentFormat::Urdf),
            other => Err(FilterError::UnknownFormat {
                root: other.to_string(),
            }),
        }
    }
}

/// A parsed description document
///
/// Only the root element is kept. Nodes before the root (processing
/// instructions, comments) are not part of the canonical form and are
/// dropped at parse time.
///
/// # Note on DOCTYPE
///
/// DOCTYPE declarations are silently discarded by xmltree.
#[derive(Debug, Clone)]
pub struct SdfDocument {
    /// Format detected on input
    pub format: DocumentFormat,

    /// Root element
    pub root: Element,
}

impl SdfDocument {
    /// Parse an XML document and detect its format
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - XML is malformed (`FilterError::InvalidXml`; file loading reports
    ///   `FilterError::Xml` with the path instead)
    /// - No root element or multiple root elements are found
    /// - The root is neither `<sdf>` nor `<robot>`
    pub fn parse<R: std::io::Read>(reader: R) -> Result<Self, FilterError> {
        let all_nodes = Element::parse_all(reader)
            .map_err(|e| FilterError::InvalidXml(e.to_string()))?;
        Self::from_nodes(all_nodes)
    }

    pub(crate) fn from_nodes(all_nodes: Vec<XMLNode>) -> Result<Self, FilterError> {
        let mut root = None;

        for node in all_nodes {
            match node {
                XMLNode::Element(elem) => {
                    if root.is_none() {
                        root = Some(elem);
                    } else {
                        return Err(FilterError::InvalidXml(
                            "Document has multiple root elements".into(),
                        ));
                    }
                }
                XMLNode::Text(text) if !text.trim().is_empty() => {
                    log::warn!(
                        "Non-whitespace text found outside root element: {:?}",
                        text.trim()
                    );
                }
                XMLNode::Text(_) => {}
                other => {
                    log::debug!("Dropping node outside root element: {:?}", other);
                }
            }
        }

        let root = root
            .ok_or_else(|| FilterError::InvalidXml("Document has no root element".into()))?;
        let format = DocumentFormat::detect(&root)?;

        Ok(SdfDocument { format, root })
    }

    /// Normalize the tree in place
    ///
    /// - Comments and processing instructions are removed
    /// - Whitespace-only text is removed
    /// - Remaining text is trimmed, inner whitespace runs collapse to one space
    /// - CDATA becomes plain text
    pub fn canonicalize(&mut self) {
        canonicalize_element(&mut self.root);
    }

    /// Write the canonical form
    ///
    /// Output format:
    /// 1. XML declaration: `<?xml version="1.0" ?>`
    /// 2. Root element, two-space indented, `<tag/>` for empty elements
    ///
    /// The tree is expected to be canonicalized already.
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
    ) -> Result<(), FilterError> {
        writeln!(writer, "<?xml version=\"1.0\" ?>")?;

        self.root.write_with_config(
            &mut *writer,
            xmltree::EmitterConfig::new()
                .perform_indent(true)
                .write_document_declaration(false) // Already wrote it
                .indent_string("  ")
                .pad_self_closing(false), // Use <tag/> not <tag />
        )?;

        writeln!(writer)?;
        Ok(())
    }

    /// Render the canonical form as a string
    pub fn to_canonical_string(&self) -> Result<String, FilterError> {
        let mut writer = Vec::new();
        self.write(&mut writer)?;
        Ok(String::from_utf8(writer)?)
    }
}

fn canonicalize_element(element: &mut Element) {
    let children = core::mem::take(&mut element.children);
    for child in children {
        match child {
            XMLNode::Element(mut elem) => {
                canonicalize_element(&mut elem);
                element.children.push(XMLNode::Element(elem));
            }
            XMLNode::Text(text) | XMLNode::CData(text) => {
                let collapsed = collapse_whitespace(&text);
                if collapsed.is_empty() {
                    continue;
                }
                // Merge with a preceding text node (left behind by a dropped comment)
                if let Some(XMLNode::Text(prev)) = element.children.last_mut() {
                    prev.push(' ');
                    prev.push_str(&collapsed);
                } else {
                    element.children.push(XMLNode::Text(collapsed));
                }
            }
            XMLNode::Comment(_) | XMLNode::ProcessingInstruction(..) => {}
        }
    }
}

/// Trim and collapse runs of whitespace to a single space
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of the first child element named `name`, trimmed
pub(crate) fn child_text(
    element: &Element,
    name: &str,
) -> Option<String> {
    element
        .get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
}

/// Build `<name>text</name>`
pub(crate) fn text_element(
    name: &str,
    text: impl Into<String>,
) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.into()));
    elem
}

/// Replace the text of the first child `name`, or append a new child
pub(crate) fn set_child_text(
    element: &mut Element,
    name: &str,
    text: &str,
) {
    match element.get_mut_child(name) {
        Some(child) => {
            child.children = vec![XMLNode::Text(text.to_string())];
        }
        None => element
            .children
            .push(XMLNode::Element(text_element(name, text))),
    }
}
