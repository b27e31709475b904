//! Template Lexer
//!
//! Two levels: [`split`] cuts the source into text and actions, applying
//! `{{- ` / ` -}}` trim markers and dropping comments, and [`lex_action`]
//! turns the body of one action into tokens.

use bitflags::bitflags;

pub const LEFT_DELIM: &str = "{{";
pub const RIGHT_DELIM: &str = "}}";

bitflags! {
    /// Trim markers on an action
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Trim: u8 {
        /// `{{- `: trim whitespace before the action
        const LEFT = 0b01;
        /// ` -}}`: trim whitespace after the action
        const RIGHT = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub msg: String,
}

impl LexError {
    fn new(offset: usize, msg: impl Into<String>) -> Self {
        LexError {
            offset,
            msg: msg.into(),
        }
    }
}

/// A top-level piece of template source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item<'a> {
    Text { text: &'a str, offset: usize },
    /// Action body without delimiters or trim markers
    Action { body: &'a str, offset: usize },
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn trim_space_start(text: &str) -> &str {
    text.trim_start_matches([' ', '\t', '\r', '\n'])
}

fn trim_space_end(text: &str) -> &str {
    text.trim_end_matches([' ', '\t', '\r', '\n'])
}

/// Split template source into text and actions
pub fn split(source: &str) -> Result<Vec<Item<'_>>, LexError> {
    let bytes = source.as_bytes();
    let mut items = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    loop {
        let open = source[pos..].find(LEFT_DELIM).map(|i| pos + i);
        let text_end = open.unwrap_or(source.len());

        let mut trim = Trim::empty();
        if let Some(open) = open {
            if bytes.get(open + 2) == Some(&b'-') && bytes.get(open + 3).is_some_and(|b| is_space(*b)) {
                trim |= Trim::LEFT;
            }
        }

        let mut text = &source[pos..text_end];
        let mut text_offset = pos;
        if trim_next {
            let trimmed = trim_space_start(text);
            text_offset += text.len() - trimmed.len();
            text = trimmed;
        }
        if trim.contains(Trim::LEFT) {
            text = trim_space_end(text);
        }
        if !text.is_empty() {
            items.push(Item::Text {
                text,
                offset: text_offset,
            });
        }

        let Some(open) = open else {
            break;
        };
        let body_start = if trim.contains(Trim::LEFT) { open + 3 } else { open + 2 };
        let (close, comment) = find_action_end(source, body_start).ok_or_else(|| {
            LexError::new(open, "unclosed action")
        })?;
        let mut body_end = close;
        if close >= body_start + 2 && bytes[close - 1] == b'-' && is_space(bytes[close - 2]) {
            trim |= Trim::RIGHT;
            body_end = close - 1;
        }
        if !comment {
            items.push(Item::Action {
                body: &source[body_start..body_end],
                offset: body_start,
            });
        }
        trim_next = trim.contains(Trim::RIGHT);
        pos = close + RIGHT_DELIM.len();
    }
    Ok(items)
}

/// Find the `}}` closing the action whose body starts at `start`. Returns
/// its offset and whether the action is a comment.
fn find_action_end(source: &str, start: usize) -> Option<(usize, bool)> {
    let bytes = source.as_bytes();
    let body = trim_space_start(&source[start..]);
    if body.starts_with("/*") {
        let comment_start = source.len() - body.len();
        let end = comment_start + 2 + source[comment_start + 2..].find("*/")? + 2;
        let rest = &source[end..];
        let after = trim_space_end_marker(rest);
        return after
            .starts_with(RIGHT_DELIM)
            .then_some((end + rest.len() - after.len(), true));
    }

    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some((i, false)),
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'`' => {
                i += 1 + source[i + 1..].find('`')?;
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Skip the whitespace and optional ` -` that may follow a comment
fn trim_space_end_marker(rest: &str) -> &str {
    let trimmed = trim_space_start(rest);
    if trimmed.len() < rest.len() {
        if let Some(after) = trimmed.strip_prefix('-') {
            return after;
        }
    }
    trimmed
}

/// Tokens inside an action
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `.`
    Dot,
    /// `.Name`
    Field(String),
    /// `$` (empty name) or `$name`
    Variable(String),
    /// Keyword, function name, `true`, `false` or `nil`
    Ident(String),
    Str(String),
    Char(char),
    Number(String),
    LeftParen,
    RightParen,
    Pipe,
    Declare,
    Assign,
    Comma,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Dot => "\".\"".to_string(),
            Token::Field(name) => format!("field .{}", name),
            Token::Variable(name) => format!("variable ${}", name),
            Token::Ident(name) => format!("identifier {:?}", name),
            Token::Str(s) => format!("string {:?}", s),
            Token::Char(c) => format!("char {:?}", c),
            Token::Number(n) => format!("number {}", n),
            Token::LeftParen => "\"(\"".to_string(),
            Token::RightParen => "\")\"".to_string(),
            Token::Pipe => "\"|\"".to_string(),
            Token::Declare => "\":=\"".to_string(),
            Token::Assign => "\"=\"".to_string(),
            Token::Comma => "\",\"".to_string(),
        }
    }
}

/// A token with its source offset. `spaced` is set when whitespace
/// precedes it, which separates `$x .F` (two operands) from `$x.F`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub offset: usize,
    pub spaced: bool,
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Tokenize an action body. `base` is the body's offset in the source.
pub fn lex_action(body: &str, base: usize) -> Result<Vec<Lexeme>, LexError> {
    let mut lexemes = Vec::new();
    let mut chars = body.char_indices().peekable();
    let mut spaced = true;

    while let Some(&(i, ch)) = chars.peek() {
        let offset = base + i;
        if ch.is_whitespace() {
            chars.next();
            spaced = true;
            continue;
        }

        let rest = &body[i..];
        let (token, len) = match ch {
            '(' => (Token::LeftParen, 1),
            ')' => (Token::RightParen, 1),
            '|' => (Token::Pipe, 1),
            ',' => (Token::Comma, 1),
            ':' if rest.starts_with(":=") => (Token::Declare, 2),
            '=' => (Token::Assign, 1),
            '"' => {
                let (value, len) = lex_quoted(rest, offset)?;
                (Token::Str(value), len)
            }
            '`' => {
                let end = rest[1..]
                    .find('`')
                    .ok_or_else(|| LexError::new(offset, "unterminated raw quoted string"))?;
                (Token::Str(rest[1..1 + end].to_string()), end + 2)
            }
            '\'' => {
                let (value, len) = lex_char(rest, offset)?;
                (Token::Char(value), len)
            }
            '$' => {
                let len = ident_len(&rest[1..]);
                (Token::Variable(rest[1..1 + len].to_string()), 1 + len)
            }
            '.' => {
                let next = rest[1..].chars().next();
                if next.is_some_and(|c| c.is_ascii_digit()) {
                    let len = number_len(rest, offset)?;
                    (Token::Number(rest[..len].to_string()), len)
                } else if next.is_some_and(is_ident_start) {
                    let len = ident_len(&rest[1..]);
                    (Token::Field(rest[1..1 + len].to_string()), 1 + len)
                } else {
                    (Token::Dot, 1)
                }
            }
            '0'..='9' => {
                let len = number_len(rest, offset)?;
                (Token::Number(rest[..len].to_string()), len)
            }
            '-' | '+' if rest[1..].starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                let len = number_len(rest, offset)?;
                (Token::Number(rest[..len].to_string()), len)
            }
            c if is_ident_start(c) => {
                let len = ident_len(rest);
                (Token::Ident(rest[..len].to_string()), len)
            }
            c => return Err(LexError::new(offset, format!("unexpected {:?} in command", c))),
        };

        lexemes.push(Lexeme {
            token,
            offset,
            spaced,
        });
        spaced = false;
        while chars.peek().is_some_and(|(j, _)| *j < i + len) {
            chars.next();
        }
    }
    Ok(lexemes)
}

fn ident_len(text: &str) -> usize {
    text.char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map_or(text.len(), |(i, _)| i)
}

/// Length of the number at the start of `text`
fn number_len(text: &str, offset: usize) -> Result<usize, LexError> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let radix_prefix = bytes.get(i) == Some(&b'0')
        && matches!(bytes.get(i + 1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
    if radix_prefix {
        i += 2;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
    } else {
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
            i += 1;
        }
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
        }
        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            if matches!(bytes.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    if text[i..].starts_with(is_ident_char) || text[i..].starts_with('.') {
        return Err(LexError::new(offset, format!("bad number syntax: {:?}", &text[..i + 1])));
    }
    Ok(i)
}

/// Decode one escape sequence after a backslash; returns the character and
/// the bytes consumed after the backslash
fn unescape(text: &str, quote: char) -> Option<(char, usize)> {
    let mut chars = text.chars();
    let ch = chars.next()?;
    let simple = match ch {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0C'),
        'v' => Some('\x0B'),
        '\\' => Some('\\'),
        c if c == quote => Some(c),
        _ => None,
    };
    if let Some(c) = simple {
        return Some((c, 1));
    }
    let digits = match ch {
        'x' => 2,
        'u' => 4,
        'U' => 8,
        '0'..='7' => {
            let octal = text.get(..3)?;
            let code = u32::from_str_radix(octal, 8).ok()?;
            return char::from_u32(code).map(|c| (c, 3));
        }
        _ => return None,
    };
    let hex = text.get(1..1 + digits)?;
    let code = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(code).map(|c| (c, 1 + digits))
}

fn lex_quoted(text: &str, offset: usize) -> Result<(String, usize), LexError> {
    let mut value = String::new();
    let mut i = 1;
    loop {
        let ch = text[i..]
            .chars()
            .next()
            .filter(|c| *c != '\n')
            .ok_or_else(|| LexError::new(offset, "unterminated quoted string"))?;
        match ch {
            '"' => return Ok((value, i + 1)),
            '\\' => {
                let (c, len) = unescape(&text[i + 1..], '"')
                    .ok_or_else(|| LexError::new(offset + i, "invalid escape in quoted string"))?;
                value.push(c);
                i += 1 + len;
            }
            c => {
                value.push(c);
                i += c.len_utf8();
            }
        }
    }
}

fn lex_char(text: &str, offset: usize) -> Result<(char, usize), LexError> {
    let unterminated = || LexError::new(offset, "unterminated character constant");
    let mut chars = text[1..].chars();
    let (value, len) = match chars.next().ok_or_else(unterminated)? {
        '\\' => unescape(&text[2..], '\'')
            .map(|(c, len)| (c, 1 + len))
            .ok_or_else(|| LexError::new(offset, "invalid escape in character constant"))?,
        '\'' | '\n' => return Err(unterminated()),
        c => (c, c.len_utf8()),
    };
    if !text[1 + len..].starts_with('\'') {
        return Err(unterminated());
    }
    Ok((value, len + 2))
}
