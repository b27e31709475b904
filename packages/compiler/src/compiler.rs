//! Compiler Main Module
//!
//! Parse and lower in one step: template source with component markup in,
//! host-engine source out.

use indexmap::IndexSet;

use crate::config::CompilerConfig;
use crate::lowering::Compiler;
use crate::ml_parser::{parse, ComponentSet};
use crate::parse_util::ParseError;

pub use crate::lowering::LoweredTemplate;
pub use crate::ml_parser::ParseTreeResult;

/// A template ready for the host engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Host source
    pub source: String,
    /// Capitalised tag names left as literal text because they were not
    /// known components. The template has to be compiled again once any of
    /// them is registered.
    pub forward_references: IndexSet<String>,
    /// Synthetic block names defined in `source`
    pub blocks: Vec<String>,
}

impl CompiledTemplate {
    pub fn has_forward_references(&self) -> bool {
        !self.forward_references.is_empty()
    }
}

/// Compile `source` treating the names in `components` as components
pub fn compile(
    source: &str,
    components: &dyn ComponentSet,
    config: &CompilerConfig,
) -> Result<CompiledTemplate, ParseError> {
    let ParseTreeResult {
        root_nodes,
        forward_references,
    } = parse(source, components, config)?;
    let LoweredTemplate { source, blocks } = Compiler::new().lower(&root_nodes);
    Ok(CompiledTemplate {
        source,
        forward_references,
        blocks,
    })
}
