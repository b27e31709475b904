//! Lowering Compiler
//!
//! Walks the node tree and emits host-engine source. Raw text is copied,
//! every component becomes a call-out, and the children of a component are
//! moved into a named block of their own:
//!
//! ```text
//! <Card Title="Hi">{{.Body}}</Card>
//! ```
//!
//! lowers to
//!
//! ```text
//! {{__tfRenderComponent "Card" "tf__Card__0" (__tfDict "Title" "Hi") (__tfDict "tf__dot__" . "tf__root__" $ "tf__locals__" (__tfDict))}}{{define "tf__Card__0"}}{{$.tf__dot__.Body}}{{end}}
//! ```
//!
//! Every level rewrites only the text that ends up in its own block: the
//! raw text between its components and the attribute values of the
//! components at that level.

use super::emitter::{call_out, carrier_capture, concat, define_block, dict, quote_string};
use super::scope::ScopeRewriter;
use super::BLOCK_PREFIX;
use crate::ml_parser::ast::{ComponentNode, Node};
use crate::ml_parser::lexer::{action_body, is_comment_action, split_actions, TextPart};

/// Output of lowering one template
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoweredTemplate {
    /// Host source: the main body followed by the block definitions
    pub source: String,
    /// Names of the synthetic blocks, in definition order
    pub blocks: Vec<String>,
}

/// One lowering pass. Block names are numbered from 0 per compiler.
#[derive(Debug, Default)]
pub struct Compiler {
    next_block: usize,
    definitions: Vec<(String, String)>,
}

/// Lower a node tree with a fresh [`Compiler`]
pub fn lower(nodes: &[Node]) -> LoweredTemplate {
    Compiler::new().lower(nodes)
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lower(mut self, nodes: &[Node]) -> LoweredTemplate {
        let mut source = self.lower_nodes(nodes, None);
        let mut blocks = Vec::with_capacity(self.definitions.len());
        for (id, body) in self.definitions {
            source.push_str(&define_block(&id, &body));
            blocks.push(id);
        }
        LoweredTemplate { source, blocks }
    }

    fn allocate_block(&mut self, component: &str) -> String {
        let id = format!("{}{}__{}", BLOCK_PREFIX, component, self.next_block);
        self.next_block += 1;
        id
    }

    /// `scope` is the rewriter of the enclosing block, `None` at the top
    /// level of the template
    fn lower_nodes(&mut self, nodes: &[Node], mut scope: Option<&mut ScopeRewriter>) -> String {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Raw(text) => match scope.as_deref_mut() {
                    Some(rewriter) => out.push_str(&rewriter.rewrite_text(text)),
                    None => out.push_str(text),
                },
                Node::Component(component) => {
                    out.push_str(&self.lower_component(component, scope.as_deref_mut()));
                }
            }
        }
        out
    }

    fn lower_component(
        &mut self,
        component: &ComponentNode,
        mut scope: Option<&mut ScopeRewriter>,
    ) -> String {
        let attributes = if component.attributes.is_empty() {
            "nil".to_string()
        } else {
            let entries: Vec<(&str, String)> = component
                .attributes
                .iter()
                .map(|(name, value)| {
                    (name.as_str(), attribute_argument(value, scope.as_deref_mut()))
                })
                .collect();
            dict(entries)
        };

        if !component.has_children() {
            return call_out(&component.name, "", &attributes, "nil");
        }

        let id = self.allocate_block(&component.name);
        let mut inner = ScopeRewriter::new();
        let body = self.lower_nodes(&component.children, Some(&mut inner));
        let carrier = match scope {
            Some(outer) => outer.carrier_for(&inner),
            None => carrier_capture(inner.captured().iter().map(String::as_str)),
        };
        self.definitions.push((id.clone(), body));
        call_out(&component.name, &id, &attributes, &carrier)
    }
}

/// Host argument for a raw attribute value: a quoted string for literal
/// text, `(pipeline)` for a single action and a concatenation for a mix
fn attribute_argument(value: &str, mut scope: Option<&mut ScopeRewriter>) -> String {
    let mut args = Vec::new();
    for part in split_actions(value) {
        match part {
            TextPart::Literal(literal) => args.push(quote_string(literal)),
            TextPart::Action(action) => {
                if is_comment_action(action) {
                    continue;
                }
                let pipeline = action_body(action);
                if pipeline.is_empty() {
                    continue;
                }
                let pipeline = match scope.as_deref_mut() {
                    Some(rewriter) => rewriter.rewrite_pipeline(pipeline),
                    None => pipeline.to_string(),
                };
                args.push(format!("({})", pipeline));
            }
        }
    }
    match args.len() {
        0 => quote_string(""),
        1 => args.remove(0),
        _ => concat(&args),
    }
}
