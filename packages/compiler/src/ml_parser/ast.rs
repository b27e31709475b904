//! ML Parser AST
//!
//! The tree the scanner produces: literal runs of template text and
//! component occurrences.

use indexmap::IndexMap;
use serde::Serialize;

/// Value stored for an attribute written without `=`
pub const BOOLEAN_ATTRIBUTE_VALUE: &str = "true";

/// Attribute name → raw, unevaluated value text, in source order
pub type Attributes = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Node {
    /// Literal text, emitted verbatim. Holds host-engine actions and
    /// literal markup, never an unconsumed component tag.
    Raw(String),
    Component(ComponentNode),
}

impl Node {
    pub fn raw(text: impl Into<String>) -> Self {
        Node::Raw(text.into())
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Node::Raw(text) => Some(text),
            Node::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentNode> {
        match self {
            Node::Raw(_) => None,
            Node::Component(component) => Some(component),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentNode {
    pub name: String,
    pub attributes: Attributes,
    /// Empty for self-closing tags
    pub children: Vec<Node>,
    pub self_closing: bool,
    /// Byte offset of the opening `<`
    pub offset: usize,
}

impl ComponentNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Visit every component in document order, parents before their children
pub fn visit_components<'a>(nodes: &'a [Node], visitor: &mut dyn FnMut(&'a ComponentNode)) {
    for node in nodes {
        if let Node::Component(component) = node {
            visitor(component);
            visit_components(&component.children, visitor);
        }
    }
}
