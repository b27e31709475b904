//! ML (Markup Language) Parser Module
//!
//! Scans component markup out of template text

pub mod ast;
pub mod html_tags;
pub mod lexer;
pub mod parser;
pub mod tags;

pub use ast::*;
pub use html_tags::{get_html_tag_definition, is_literal_tag, HtmlTagDefinition};
pub use parser::{parse, ComponentSet, ParseTreeResult};
pub use tags::*;
