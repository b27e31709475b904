//! Markup Lexer
//!
//! Position-tracked cursor over the template source plus the scanners for
//! embedded host-engine actions (`{{ ... }}`).
//!
//! The cursor is a small `Copy` value: every scanning function takes a
//! cursor and hands back the advanced one, so a failed lookahead never
//! disturbs the caller's position.

use crate::chars;
use crate::parse_util::{ParseError, ParseErrorKind, ParseLocation};

pub const ACTION_OPEN: &str = "{{";
pub const ACTION_CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Cursor { input, offset: 0 }
    }

    /// Cursor at a byte offset; the offset must sit on a char boundary
    pub fn at(input: &'a str, offset: usize) -> Self {
        debug_assert!(input.is_char_boundary(offset));
        Cursor { input, offset }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// The remaining, unconsumed input
    pub fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    pub fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or(chars::EOF)
    }

    /// Look `n` characters ahead; `peek_nth(0)` is `peek()`
    pub fn peek_nth(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or(chars::EOF)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Advance one character; a no-op at end of input
    #[must_use]
    pub fn advance(self) -> Self {
        match self.rest().chars().next() {
            Some(ch) => Cursor {
                input: self.input,
                offset: self.offset + ch.len_utf8(),
            },
            None => self,
        }
    }

    /// Advance past `prefix`, which the caller has checked with [`Cursor::starts_with`]
    #[must_use]
    pub fn advance_str(self, prefix: &str) -> Self {
        debug_assert!(self.starts_with(prefix));
        Cursor {
            input: self.input,
            offset: (self.offset + prefix.len()).min(self.input.len()),
        }
    }

    #[must_use]
    pub fn skip_whitespace(self) -> Self {
        let mut cursor = self;
        while !cursor.is_eof() && chars::is_whitespace(cursor.peek()) {
            cursor = cursor.advance();
        }
        cursor
    }

    /// Advance to the start of the next occurrence of `needle`, or to the end
    #[must_use]
    pub fn seek(self, needle: &str) -> Self {
        match self.rest().find(needle) {
            Some(i) => Cursor::at(self.input, self.offset + i),
            None => Cursor::at(self.input, self.input.len()),
        }
    }

    /// Source text between `start` and this cursor
    pub fn slice_from(&self, start: Cursor<'a>) -> &'a str {
        &self.input[start.offset..self.offset]
    }

    pub fn location(&self) -> ParseLocation {
        ParseLocation::from_offset(self.input, self.offset)
    }

    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.input, self.offset)
    }
}

/// Scan one action starting at `{{`, returning the cursor just past its `}}`.
///
/// String (`"..."`), raw string (`` `...` ``) and char (`'.'`) literals and
/// `/* ... */` comments are skipped whole, so delimiters and quotes inside
/// them never end the action. A second `{{` outside a literal is rejected:
/// actions do not nest.
pub fn scan_action(start: Cursor<'_>) -> Result<Cursor<'_>, ParseError> {
    debug_assert!(start.starts_with(ACTION_OPEN));
    let mut cursor = start.advance_str(ACTION_OPEN);
    loop {
        if cursor.is_eof() {
            return Err(start.error(ParseErrorKind::UnterminatedAction));
        }
        if cursor.starts_with(ACTION_CLOSE) {
            return Ok(cursor.advance_str(ACTION_CLOSE));
        }
        if cursor.starts_with(ACTION_OPEN) {
            return Err(cursor.error(ParseErrorKind::NestedActionDelimiter));
        }
        cursor = match cursor.peek() {
            chars::DQ | chars::SQ => skip_quoted(cursor, cursor.peek(), true)
                .ok_or_else(|| start.error(ParseErrorKind::UnterminatedAction))?,
            chars::BT => skip_quoted(cursor, chars::BT, false)
                .ok_or_else(|| start.error(ParseErrorKind::UnterminatedAction))?,
            chars::SLASH if cursor.peek_nth(1) == chars::STAR => {
                let end = cursor.advance_str("/*").seek("*/");
                if end.is_eof() {
                    return Err(start.error(ParseErrorKind::UnterminatedAction));
                }
                end.advance_str("*/")
            }
            _ => cursor.advance(),
        };
    }
}

/// Skip an action embedded in literal text. Malformed actions are left for
/// the host engine to report, so this only steps over the opening delimiter.
pub fn skip_text_action(start: Cursor<'_>) -> Cursor<'_> {
    scan_action(start).unwrap_or_else(|_| start.advance_str(ACTION_OPEN))
}

/// Skip a quoted literal starting at the opening quote. Returns `None` when
/// the literal is not closed. Interpreted literals honour backslash escapes
/// and may not span lines.
fn skip_quoted(start: Cursor<'_>, quote: char, escapes: bool) -> Option<Cursor<'_>> {
    let mut cursor = start.advance();
    loop {
        if cursor.is_eof() {
            return None;
        }
        let ch = cursor.peek();
        if escapes && ch == chars::LF {
            return None;
        }
        if escapes && ch == chars::BACKSLASH {
            cursor = cursor.advance().advance();
            continue;
        }
        cursor = cursor.advance();
        if ch == quote {
            return Some(cursor);
        }
    }
}

/// A piece of text split at action boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPart<'a> {
    Literal(&'a str),
    /// Full action text, delimiters included
    Action(&'a str),
}

/// Split text into literal runs and actions. Text after an action that
/// fails to scan is kept as a literal.
pub fn split_actions(text: &str) -> Vec<TextPart<'_>> {
    let mut parts = Vec::new();
    let mut cursor = Cursor::new(text);
    let mut literal_start = cursor;
    while !cursor.is_eof() {
        let next = cursor.seek(ACTION_OPEN);
        if next.is_eof() {
            break;
        }
        match scan_action(next) {
            Ok(end) => {
                if next.offset() > literal_start.offset() {
                    parts.push(TextPart::Literal(next.slice_from(literal_start)));
                }
                parts.push(TextPart::Action(end.slice_from(next)));
                cursor = end;
                literal_start = end;
            }
            Err(_) => break,
        }
    }
    let tail = Cursor::at(text, text.len());
    if tail.offset() > literal_start.offset() {
        parts.push(TextPart::Literal(tail.slice_from(literal_start)));
    }
    parts
}

/// Strip the delimiters and trim markers from an action, returning the
/// pipeline text inside, e.g. `{{- .Name -}}` gives `.Name`
pub fn action_body(action: &str) -> &str {
    let inner = action
        .strip_prefix(ACTION_OPEN)
        .and_then(|s| s.strip_suffix(ACTION_CLOSE))
        .unwrap_or(action);
    let inner = match inner.strip_prefix(chars::MINUS) {
        Some(rest) if rest.starts_with(chars::is_whitespace) => rest,
        _ => inner,
    };
    let inner = match inner.strip_suffix(chars::MINUS) {
        Some(rest) if rest.ends_with(chars::is_whitespace) => rest,
        _ => inner,
    };
    inner.trim()
}

/// Whether the action is a comment, `{{/* ... */}}`
pub fn is_comment_action(action: &str) -> bool {
    action_body(action).starts_with("/*")
}
