#![deny(clippy::all)]

/**
 * Tagforge Template Engine
 *
 * Text templates in the style of Go's text/template: the language the
 * component compiler lowers to, and the runtime that executes it
 */

pub mod ast;
mod error;
mod exec;
pub mod funcs;
pub mod lexer;
mod parser;
mod template;
pub mod value;

// Re-exports
pub use error::{FuncError, TemplateError};
pub use funcs::{Call, Func, FuncMap};
pub use template::{Template, TemplateOptions};
pub use value::{Html, Value};
