//! HTML Tag Definitions
//!
//! The literal-markup tag table. Component names may not collide with any
//! of these (case-insensitively), and capitalised tags that match one are
//! never recorded as forward references.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub use super::tags::TagContentType;

/// HTML tag definition with the parsing rules the scanner cares about
#[derive(Debug, Clone)]
pub struct HtmlTagDefinition {
    pub content_type: TagContentType,
}

impl HtmlTagDefinition {
    pub fn new() -> Self {
        HtmlTagDefinition {
            content_type: TagContentType::ParsableData,
        }
    }

    pub fn with_content_type(mut self, content_type: TagContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

impl Default for HtmlTagDefinition {
    fn default() -> Self {
        Self::new()
    }
}

// Everything a browser recognises, including void elements and the SVG and
// MathML roots
const ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr", "a", "abbr", "address", "article", "aside", "audio", "b", "bdi", "bdo", "blockquote",
    "body", "button", "canvas", "caption", "cite", "code", "colgroup", "data", "datalist",
    "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "header", "hgroup", "html", "i", "iframe", "ins", "kbd", "label", "legend", "li", "main",
    "map", "mark", "math", "menu", "meter", "nav", "noscript", "object", "ol", "optgroup",
    "option", "output", "p", "picture", "pre", "progress", "q", "rp", "rt", "ruby", "s",
    "samp", "search", "section", "select", "slot", "small", "span", "strong", "sub",
    "summary", "sup", "svg", "table", "tbody", "td", "template", "tfoot", "th", "thead",
    "time", "tr", "u", "ul", "var", "video",
];

static TAG_DEFINITIONS: Lazy<HashMap<&'static str, HtmlTagDefinition>> = Lazy::new(|| {
    let mut defs = HashMap::new();

    for tag in ELEMENTS {
        defs.insert(*tag, HtmlTagDefinition::new());
    }

    defs.insert("script", HtmlTagDefinition::new().with_content_type(TagContentType::RawText));
    defs.insert("style", HtmlTagDefinition::new().with_content_type(TagContentType::RawText));
    defs.insert(
        "textarea",
        HtmlTagDefinition::new().with_content_type(TagContentType::EscapableRawText),
    );
    defs.insert(
        "title",
        HtmlTagDefinition::new().with_content_type(TagContentType::EscapableRawText),
    );

    defs
});

static DEFAULT_TAG_DEFINITION: Lazy<HtmlTagDefinition> = Lazy::new(HtmlTagDefinition::new);

/// Whether `tag_name` is a literal-markup tag. HTML tag names are case
/// insensitive, so `Title` and `DIV` both count.
pub fn is_literal_tag(tag_name: &str) -> bool {
    TAG_DEFINITIONS.contains_key(tag_name)
        || TAG_DEFINITIONS.contains_key(tag_name.to_ascii_lowercase().as_str())
}

pub fn get_html_tag_definition(tag_name: &str) -> &'static HtmlTagDefinition {
    TAG_DEFINITIONS
        .get(tag_name)
        .or_else(|| TAG_DEFINITIONS.get(tag_name.to_ascii_lowercase().as_str()))
        .unwrap_or(&DEFAULT_TAG_DEFINITION)
}
