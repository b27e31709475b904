#![deny(clippy::all)]

/**
 * Tagforge Compiler
 *
 * Component-tag preprocessor: scans component markup out of template text
 * and lowers it to host template-engine source
 */

// Core modules
pub mod chars;
pub mod compiler;
mod config;
pub mod parse_util;

// Parser and code generation
pub mod lowering;
pub mod ml_parser;

// Re-exports
pub use compiler::{compile, CompiledTemplate};
pub use config::CompilerConfig;
pub use lowering::{lower, LoweredTemplate, ScopeRewriter};
pub use ml_parser::{
    is_literal_tag, is_valid_component_name, parse, ComponentNode, ComponentSet, Node,
    ParseTreeResult,
};
pub use parse_util::{ParseError, ParseErrorKind, ParseLocation};
