//! Output elements built by the tree renderer.

use std::fmt::{self, Write};

use crate::util::escape_html;

/// Child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Text, escaped on serialization.
    Text(String),
    /// Markup written out verbatim.
    Raw(String),
    Element(Element),
}

/// A named element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    void: bool,
}

impl Element {
    /// A container element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            void: false,
        }
    }

    /// A self-closing element. Void elements never hold children.
    pub fn void(name: impl Into<String>) -> Self {
        Self {
            void: true,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.void
    }

    /// Append a child. Ignored for void elements.
    pub fn push(&mut self, node: Node) {
        if !self.void {
            self.children.push(node);
        }
    }

    /// Append text, merging with a preceding text child.
    pub fn push_text(&mut self, text: &str) {
        if self.void {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_owned()));
        }
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of this element and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) | Node::Raw(text) => out.push_str(text),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, r#" {name}="{}""#, escape_html(value))?;
        }
        f.write_char('>')?;
        if self.void {
            return Ok(());
        }
        for child in &self.children {
            match child {
                Node::Text(text) => f.write_str(&escape_html(text))?,
                Node::Raw(raw) => f.write_str(raw)?,
                Node::Element(e) => write!(f, "{e}")?,
            }
        }
        write!(f, "</{}>", self.name)
    }
}
