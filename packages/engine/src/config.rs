//! Engine configuration

use serde::{Deserialize, Serialize};
use tagforge_compiler::CompilerConfig;
use tagforge_template::TemplateOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub compiler: CompilerConfig,
    /// HTML-escape values printed by component templates
    pub escape_html: bool,
    /// Maximum nesting of components within one render
    pub max_render_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            compiler: CompilerConfig::default(),
            escape_html: true,
            max_render_depth: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Options for compiled component templates. A component level costs
    /// up to two template invocations: its children block and its own
    /// template.
    pub fn template_options(&self) -> TemplateOptions {
        TemplateOptions {
            escape_html: self.escape_html,
            max_depth: self.max_render_depth.saturating_mul(2),
        }
    }
}
