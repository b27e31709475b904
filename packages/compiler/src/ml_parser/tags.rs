//! ML Parser Tags
//!
//! Tag content types and the naming rules that separate component tags
//! from literal markup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chars;

/// Tag content types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagContentType {
    /// Content is literal text up to the close tag (`script`, `style`)
    RawText,
    /// Like `RawText`, but character references are decoded by browsers
    /// (`textarea`, `title`)
    EscapableRawText,
    ParsableData,
}

impl TagContentType {
    /// Whether tags inside the element are text rather than markup
    pub fn is_raw(self) -> bool {
        matches!(self, TagContentType::RawText | TagContentType::EscapableRawText)
    }
}

static COMPONENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z0-9_]*$").expect("component name pattern is valid")
});

/// A tag is a component candidate when its name starts with an upper case letter
pub fn is_component_candidate(tag_name: &str) -> bool {
    tag_name.chars().next().is_some_and(chars::is_ascii_upper)
}

/// Whether `name` is usable as a component name: exported-cased and made of
/// identifier characters only
pub fn is_valid_component_name(name: &str) -> bool {
    COMPONENT_NAME.is_match(name)
}
