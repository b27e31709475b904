/*
 * Character Codes
 *
 * Shared by the markup scanner and the scope rewriter
 */

//! Character constants used throughout the compiler

// Special characters
pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const VTAB: char = '\x0B';
pub const FF: char = '\x0C';
pub const CR: char = '\r';
pub const SPACE: char = ' ';

// Punctuation
pub const DQ: char = '"';
pub const DOLLAR: char = '$';
pub const SQ: char = '\'';
pub const STAR: char = '*';
pub const MINUS: char = '-';
pub const SLASH: char = '/';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const BACKSLASH: char = '\\';
pub const BT: char = '`';

/// Check if character is whitespace
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == LF || ch == CR || ch == VTAB || ch == FF
}

/// Check if character is ASCII letter
pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

/// Check if character is an upper case ASCII letter
pub fn is_ascii_upper(ch: char) -> bool {
    ch.is_ascii_uppercase()
}

/// Check if character is a quote that may open an attribute value
pub fn is_attribute_quote(ch: char) -> bool {
    ch == SQ || ch == DQ
}

/// Check if character ends a tag name
pub fn is_name_end(ch: char) -> bool {
    is_whitespace(ch) || ch == GT || ch == SLASH || ch == EOF
}

/// Check if byte can be part of a host-engine identifier (variable, field
/// and function names). Bytes of multi-byte characters count.
pub fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
