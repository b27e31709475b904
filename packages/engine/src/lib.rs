#![deny(clippy::all)]

/**
 * Tagforge
 *
 * Component templates: register a type with a template that may use other
 * components as tags, then render values of that type
 */

mod component;
mod config;
mod engine;
mod error;
pub mod graph;
mod registry;
mod runtime;

// Re-exports
pub use component::Component;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use runtime::dict;

pub use tagforge_compiler::{CompilerConfig, ParseError, ParseErrorKind};
pub use tagforge_template::{Call, FuncError, FuncMap, Html, TemplateError, TemplateOptions, Value};
