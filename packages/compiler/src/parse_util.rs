//! Parse Utilities
//!
//! Source locations and the typed error returned by the markup scanner.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::chars;

/// A position in the template source. `offset` is a byte offset, `line`
/// and `col` are 1-based (columns count characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLocation {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { offset, line, col }
    }

    /// Resolve a byte offset into a location. Offsets past the end, or
    /// inside a multi-byte character, are clamped to the previous boundary.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches(chars::LF).count() + 1;
        let line_start = before.rfind(chars::LF).map(|i| i + 1).unwrap_or(0);
        let col = before[line_start..].chars().count() + 1;
        ParseLocation { offset, line, col }
    }
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Reason a template could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseErrorKind {
    #[error("unexpected end of input in {0}")]
    UnexpectedEof(&'static str),

    #[error("unclosed component tag <{name}>")]
    UnclosedComponent { name: String },

    #[error("closing tag </{found}> does not match open component <{expected}>")]
    MismatchedCloseTag { expected: String, found: String },

    #[error("malformed attribute: {0}")]
    MalformedAttribute(String),

    #[error("unterminated action")]
    UnterminatedAction,

    #[error("nested action delimiter inside an action")]
    NestedActionDelimiter,

    #[error("actions are not allowed in the attribute list of component <{0}>")]
    DynamicAttributeList(String),

    #[error("markup nesting exceeds the maximum depth of {0}")]
    NestingTooDeep(usize),
}

/// A structural parse failure, carrying the offending location
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} at {location}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: ParseLocation,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, source: &str, offset: usize) -> Self {
        ParseError {
            kind,
            location: ParseLocation::from_offset(source, offset),
        }
    }

    /// Byte offset of the failure in the template source
    pub fn offset(&self) -> usize {
        self.location.offset
    }

    /// Human readable reason, without the location
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }

    /// The message with a short excerpt of the source around the failure,
    /// e.g. `unclosed component tag <Card> ("<div>[ERROR ->]<Card>")`
    pub fn contextual_message(&self, source: &str) -> String {
        const MAX_CHARS: usize = 40;

        let offset = self.location.offset.min(source.len());
        let before: String = {
            let head: Vec<char> = source[..offset].chars().rev().take(MAX_CHARS).collect();
            let head: String = head.into_iter().rev().collect();
            match head.rfind(chars::LF) {
                Some(i) => head[i + 1..].to_string(),
                None => head,
            }
        };
        let after: String = source[offset..]
            .chars()
            .take(MAX_CHARS)
            .take_while(|c| *c != chars::LF)
            .collect();
        format!("{} (\"{}[ERROR ->]{}\")", self.kind, before, after)
    }
}
