//! Lowering Module
//!
//! Turns a parsed node tree into host-engine source: component occurrences
//! become call-outs to the render runtime and component children are hoisted
//! into named blocks.

pub mod compiler;
pub mod emitter;
pub mod scope;

pub use compiler::{lower, Compiler, LoweredTemplate};
pub use scope::ScopeRewriter;

/// Runtime function rendering one component occurrence
pub const RENDER_COMPONENT_FUNC: &str = "__tfRenderComponent";
/// Runtime function building a dictionary from key/value pairs
pub const DICT_FUNC: &str = "__tfDict";
/// Runtime function joining the string forms of its arguments
pub const CONCAT_FUNC: &str = "__tfConcat";

/// Carrier field holding the item `.` referred to at the call site
pub const DOT_KEY: &str = "tf__dot__";
/// Carrier field holding the root data `$`
pub const ROOT_KEY: &str = "tf__root__";
/// Carrier field holding the captured variables
pub const LOCALS_KEY: &str = "tf__locals__";

/// Prefix of every synthetic block name
pub const BLOCK_PREFIX: &str = "tf__";
