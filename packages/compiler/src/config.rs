//! Compiler configuration

use serde::{Deserialize, Serialize};

/// Options for scanning and lowering a component template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Maximum nesting of component tags inside one template
    pub max_depth: usize,
}

impl CompilerConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
