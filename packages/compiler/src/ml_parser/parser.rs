//! Component Markup Parser
//!
//! Recursive descent over the template source. Tags whose name is a known
//! component become [`Node::Component`] (with their children parsed up to
//! the matching close tag); everything else, literal markup included, is
//! kept as [`Node::Raw`] text. Capitalised tags that are neither known
//! components nor literal markup are collected as forward references so
//! the template can be parsed again once they are registered.
//!
//! Scanning threads a [`Cursor`] value through every call; the parser
//! object only holds the bookkeeping that outlives a single tag.

use indexmap::IndexSet;
use std::collections::{BTreeSet, HashSet};
use std::hash::BuildHasher;

use super::ast::{Attributes, ComponentNode, Node, BOOLEAN_ATTRIBUTE_VALUE};
use super::html_tags::{get_html_tag_definition, is_literal_tag};
use super::lexer::{scan_action, skip_text_action, Cursor, ACTION_OPEN};
use super::tags::is_component_candidate;
use crate::chars;
use crate::config::CompilerConfig;
use crate::parse_util::{ParseError, ParseErrorKind};

/// The set of names the parser treats as components
pub trait ComponentSet {
    fn contains_component(&self, name: &str) -> bool;
}

impl<S: BuildHasher> ComponentSet for HashSet<String, S> {
    fn contains_component(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<S: BuildHasher> ComponentSet for IndexSet<String, S> {
    fn contains_component(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ComponentSet for BTreeSet<String> {
    fn contains_component(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ComponentSet for [&str] {
    fn contains_component(&self, name: &str) -> bool {
        self.iter().any(|known| *known == name)
    }
}

impl<const N: usize> ComponentSet for [&str; N] {
    fn contains_component(&self, name: &str) -> bool {
        self.iter().any(|known| *known == name)
    }
}

impl<T: ComponentSet + ?Sized> ComponentSet for &T {
    fn contains_component(&self, name: &str) -> bool {
        (**self).contains_component(name)
    }
}

/// Result of parsing one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTreeResult {
    pub root_nodes: Vec<Node>,
    /// Capitalised tag names that were not known components, in order of
    /// first appearance
    pub forward_references: IndexSet<String>,
}

/// Parse a template into a node tree
pub fn parse(
    source: &str,
    components: &dyn ComponentSet,
    config: &CompilerConfig,
) -> Result<ParseTreeResult, ParseError> {
    let mut parser = Parser {
        source,
        components,
        config,
        forward_references: IndexSet::new(),
        open: Vec::new(),
    };
    let (root_nodes, _) = parser.parse_content(Cursor::new(source), None)?;
    Ok(ParseTreeResult {
        root_nodes,
        forward_references: parser.forward_references,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagEnd {
    Open,
    SelfClosing,
}

struct OpenTag<'a> {
    attributes: Attributes,
    end: TagEnd,
    after: Cursor<'a>,
}

struct Parser<'a> {
    source: &'a str,
    components: &'a dyn ComponentSet,
    config: &'a CompilerConfig,
    forward_references: IndexSet<String>,
    /// Components whose children are being scanned, outermost first
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    /// Scan content up to the close tag of `until` (name and offset of its
    /// opening `<`), or to the end of input at the top level.
    fn parse_content(
        &mut self,
        start: Cursor<'a>,
        until: Option<(&str, usize)>,
    ) -> Result<(Vec<Node>, Cursor<'a>), ParseError> {
        let mut nodes = Vec::new();
        let mut cursor = start;
        let mut text_start = start;

        loop {
            if cursor.is_eof() {
                push_text(&mut nodes, cursor.slice_from(text_start));
                return match until {
                    None => Ok((nodes, cursor)),
                    Some((name, offset)) => Err(ParseError::new(
                        ParseErrorKind::UnclosedComponent { name: name.to_string() },
                        self.source,
                        offset,
                    )),
                };
            }

            // A `<` inside an action is never markup
            if cursor.starts_with(ACTION_OPEN) {
                cursor = skip_text_action(cursor);
                continue;
            }

            if cursor.peek() != chars::LT {
                cursor = cursor.advance();
                continue;
            }

            let next = cursor.peek_nth(1);
            if next == chars::SLASH {
                let (name, after) = self.read_close_tag(cursor)?;
                if let Some((expected, _)) = until {
                    if name == expected {
                        push_text(&mut nodes, cursor.slice_from(text_start));
                        return Ok((nodes, after));
                    }
                    if self.open.iter().any(|open| open == name) {
                        return Err(cursor.error(ParseErrorKind::MismatchedCloseTag {
                            expected: expected.to_string(),
                            found: name.to_string(),
                        }));
                    }
                }
                push_text(&mut nodes, cursor.slice_from(text_start));
                nodes.push(Node::raw(after.slice_from(cursor)));
                cursor = after;
                text_start = after;
            } else if chars::is_ascii_letter(next) {
                push_text(&mut nodes, cursor.slice_from(text_start));
                let (node, after) = self.parse_tag(cursor)?;
                nodes.push(node);
                cursor = after;
                text_start = after;
            } else if cursor.starts_with("<!--") {
                let end = cursor.advance_str("<!--").seek("-->");
                cursor = if end.is_eof() { end } else { end.advance_str("-->") };
            } else {
                cursor = cursor.advance();
            }
        }
    }

    /// Read `</name>`, returning the trimmed name and the cursor past `>`
    fn read_close_tag(&self, start: Cursor<'a>) -> Result<(&'a str, Cursor<'a>), ParseError> {
        let name_start = start.advance_str("</");
        let end = name_start.seek(">");
        if end.is_eof() {
            return Err(end.error(ParseErrorKind::UnexpectedEof("closing tag")));
        }
        Ok((end.slice_from(name_start).trim(), end.advance()))
    }

    /// Parse the tag starting at `<`
    fn parse_tag(&mut self, start: Cursor<'a>) -> Result<(Node, Cursor<'a>), ParseError> {
        let name_start = start.advance();
        let mut cursor = name_start;
        while !chars::is_name_end(cursor.peek()) && !cursor.starts_with(ACTION_OPEN) {
            cursor = cursor.advance();
        }
        let name = cursor.slice_from(name_start);
        let candidate = is_component_candidate(name);
        let known = candidate && self.components.contains_component(name);

        let tag = self.parse_attributes(cursor, name, known)?;

        if known {
            let (children, after) = match tag.end {
                TagEnd::SelfClosing => (Vec::new(), tag.after),
                TagEnd::Open => {
                    if self.open.len() >= self.config.max_depth {
                        return Err(start.error(ParseErrorKind::NestingTooDeep(
                            self.config.max_depth,
                        )));
                    }
                    self.open.push(name.to_string());
                    let result = self.parse_content(tag.after, Some((name, start.offset())));
                    self.open.pop();
                    result?
                }
            };
            let component = ComponentNode {
                name: name.to_string(),
                attributes: tag.attributes,
                children,
                self_closing: tag.end == TagEnd::SelfClosing,
                offset: start.offset(),
            };
            return Ok((Node::Component(component), after));
        }

        if candidate && !is_literal_tag(name) {
            self.forward_references.insert(name.to_string());
        }

        let mut after = tag.after;
        if tag.end == TagEnd::Open && get_html_tag_definition(name).content_type.is_raw() {
            after = skip_raw_text(after, name);
        }
        Ok((Node::raw(after.slice_from(start)), after))
    }

    /// Parse the attribute list up to and including `>` or `/>`.
    /// `strict` is set for known components, whose attributes are bound to
    /// fields and so must be well formed; literal tags are scanned leniently.
    fn parse_attributes(
        &self,
        start: Cursor<'a>,
        tag_name: &str,
        strict: bool,
    ) -> Result<OpenTag<'a>, ParseError> {
        let mut attributes = Attributes::new();
        let mut cursor = start;

        loop {
            cursor = cursor.skip_whitespace();
            if cursor.is_eof() {
                return Err(cursor.error(ParseErrorKind::UnexpectedEof("tag")));
            }

            match cursor.peek() {
                chars::GT => {
                    return Ok(OpenTag { attributes, end: TagEnd::Open, after: cursor.advance() });
                }
                chars::SLASH if cursor.peek_nth(1) == chars::GT => {
                    return Ok(OpenTag {
                        attributes,
                        end: TagEnd::SelfClosing,
                        after: cursor.advance_str("/>"),
                    });
                }
                chars::SLASH => cursor = cursor.advance(),
                _ if cursor.starts_with(ACTION_OPEN) => {
                    if strict {
                        return Err(cursor.error(ParseErrorKind::DynamicAttributeList(
                            tag_name.to_string(),
                        )));
                    }
                    cursor = scan_action(cursor)?;
                }
                _ => {
                    let (attribute, after) = self.parse_attribute(cursor, strict)?;
                    if let Some((name, value)) = attribute {
                        attributes.insert(name.to_string(), value);
                    }
                    cursor = after;
                }
            }
        }
    }

    fn parse_attribute(
        &self,
        start: Cursor<'a>,
        strict: bool,
    ) -> Result<(Option<(&'a str, String)>, Cursor<'a>), ParseError> {
        let mut cursor = start;
        while !cursor.is_eof() {
            let ch = cursor.peek();
            if chars::is_whitespace(ch)
                || ch == chars::EQ
                || ch == chars::GT
                || chars::is_attribute_quote(ch)
                || (ch == chars::SLASH && cursor.peek_nth(1) == chars::GT)
                || cursor.starts_with(ACTION_OPEN)
            {
                break;
            }
            cursor = cursor.advance();
        }
        let name = cursor.slice_from(start);

        if name.is_empty() {
            if strict {
                return Err(start.error(ParseErrorKind::MalformedAttribute(
                    "missing attribute name".to_string(),
                )));
            }
            // Stray `=` or quote in literal markup
            let after = if chars::is_attribute_quote(start.peek()) {
                parse_quoted_value(start)?.1
            } else {
                start.advance()
            };
            return Ok((None, after));
        }

        let lookahead = cursor.skip_whitespace();
        if lookahead.peek() != chars::EQ {
            return Ok((Some((name, BOOLEAN_ATTRIBUTE_VALUE.to_string())), cursor));
        }

        let value_start = lookahead.advance().skip_whitespace();
        if value_start.is_eof() {
            return Err(value_start.error(ParseErrorKind::UnexpectedEof("attribute value")));
        }
        if chars::is_attribute_quote(value_start.peek()) {
            let (value, after) = parse_quoted_value(value_start)?;
            return Ok((Some((name, value.to_string())), after));
        }
        if strict {
            return Err(value_start.error(ParseErrorKind::MalformedAttribute(format!(
                "value of attribute `{}` must be quoted",
                name
            ))));
        }

        let mut end = value_start;
        while !end.is_eof() && !chars::is_whitespace(end.peek()) && end.peek() != chars::GT {
            end = if end.starts_with(ACTION_OPEN) { scan_action(end)? } else { end.advance() };
        }
        Ok((Some((name, end.slice_from(value_start).to_string())), end))
    }
}

/// Parse a quoted value starting at its opening quote. Actions inside the
/// value are skipped whole, so `value="{{ fn "x" }}"` keeps its inner quotes.
fn parse_quoted_value(start: Cursor<'_>) -> Result<(&str, Cursor<'_>), ParseError> {
    let quote = start.peek();
    let content = start.advance();
    let mut cursor = content;
    loop {
        if cursor.is_eof() {
            return Err(start.error(ParseErrorKind::UnexpectedEof("attribute value")));
        }
        if cursor.starts_with(ACTION_OPEN) {
            cursor = scan_action(cursor)?;
            continue;
        }
        if cursor.peek() == quote {
            return Ok((cursor.slice_from(content), cursor.advance()));
        }
        cursor = cursor.advance();
    }
}

/// Skip the content of a raw text element up to (not including) its close
/// tag, or to the end of input
fn skip_raw_text<'a>(start: Cursor<'a>, tag_name: &str) -> Cursor<'a> {
    let mut cursor = start;
    loop {
        cursor = cursor.seek("</");
        if cursor.is_eof() {
            return cursor;
        }
        let rest = cursor.advance_str("</").rest();
        let matches_name = rest
            .get(..tag_name.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(tag_name));
        if matches_name {
            let following = rest[tag_name.len()..].chars().next().unwrap_or(chars::EOF);
            if chars::is_name_end(following) {
                return cursor;
            }
        }
        cursor = cursor.advance_str("</");
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::raw(text));
    }
}
