//! Owned XML element trees.
//!
//! The prover speaks a small XML dialect. Frames are decoded into
//! [`Element`] values that own their data, so they can cross the channel
//! between the background reader and the protocol client.

use std::borrow::Cow;
use std::fmt;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::XmlError;

/// One XML element with its attributes, children and direct text.
///
/// `text` is the concatenation of the text nodes found directly inside the
/// element, entities resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Add a child element (builder style).
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content (builder style).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Value of the attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Check the element's tag.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Parse a document holding exactly one root element.
    pub fn parse(input: &str) -> Result<Element, XmlError> {
        Self::parse_bytes(input.as_bytes())
    }

    /// Parse raw bytes holding exactly one root element.
    pub fn parse_bytes(input: &[u8]) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().expand_empty_elements = true;

        let mut tree = TreeBuilder::default();
        let mut root = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    tree.open(&start)?;
                }
                Event::End(_) => {
                    if let Some(done) = tree.close() {
                        root = Some(done);
                    }
                }
                Event::Text(text) => {
                    let text = decode_text(&text);
                    if tree.depth() > 0 {
                        tree.push_text(&text);
                    } else if !text.trim().is_empty() {
                        return Err(XmlError::TrailingContent);
                    }
                }
                Event::CData(data) => tree.push_text(&String::from_utf8_lossy(&data)),
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = tree.innermost() {
            return Err(XmlError::Incomplete {
                open: open.to_string(),
            });
        }
        root.ok_or(XmlError::NoElement)
    }

    /// Parse a sequence of sibling elements with no common wrapper.
    ///
    /// `<a/><b/>` is not a well-formed document, so the input is wrapped in
    /// a synthetic list element first and its children are returned.
    pub fn parse_forest(input: &str) -> Result<Vec<Element>, XmlError> {
        let wrapped = format!("<forest>{input}</forest>");
        Self::parse(&wrapped).map(|list| list.children)
    }

    /// Serialize back to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        out.push('>');
        out.push_str(&partial_escape(self.text.as_str()));
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

/// Builds element trees out of start/text/end parser events.
///
/// Shared by the whole-document parser above and the streaming framer.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    stack: Vec<Element>,
}

impl TreeBuilder {
    /// Number of currently open elements.
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Name of the innermost open element.
    pub(crate) fn innermost(&self) -> Option<&str> {
        self.stack.last().map(|e| e.name.as_str())
    }

    pub(crate) fn open(&mut self, start: &BytesStart<'_>) -> Result<(), XmlError> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            element.attributes.push((key, value));
        }
        self.stack.push(element);
        Ok(())
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.text.push_str(text);
        }
    }

    /// Close the innermost element. Returns it when it was a root.
    pub(crate) fn close(&mut self) -> Option<Element> {
        let done = self.stack.pop()?;
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(done);
                None
            }
            None => Some(done),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Resolve entities in a text node.
///
/// The prover uses `&nbsp;` in pretty-printed goals, which is not one of the
/// predefined XML entities. Undecodable text is kept raw.
pub(crate) fn decode_text<'a>(text: &'a BytesText<'_>) -> Cow<'a, str> {
    match text.unescape_with(|entity| match entity {
        "nbsp" => Some("\u{a0}"),
        _ => None,
    }) {
        Ok(decoded) => decoded,
        Err(_) => String::from_utf8_lossy(text),
    }
}
