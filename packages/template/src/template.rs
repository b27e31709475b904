//! Template
//!
//! A parsed template and the named blocks it defines.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ast::Tree;
use crate::error::TemplateError;
use crate::exec::Exec;
use crate::funcs::{self, FuncMap};
use crate::parser;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// HTML-escape printed values that are not [`crate::Html`]
    pub escape_html: bool,
    /// Maximum nesting of template and block invocations
    pub max_depth: usize,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        TemplateOptions {
            escape_html: true,
            max_depth: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    trees: IndexMap<String, Tree>,
    options: TemplateOptions,
}

impl Template {
    /// Parse `source`. Functions it calls must be builtins or in `funcs`;
    /// the functions used at execution time may differ as long as the
    /// names still resolve.
    pub fn parse(name: &str, source: &str, funcs: &FuncMap) -> Result<Self, TemplateError> {
        Self::parse_with_options(name, source, funcs, TemplateOptions::default())
    }

    pub fn parse_with_options(
        name: &str,
        source: &str,
        funcs: &FuncMap,
        options: TemplateOptions,
    ) -> Result<Self, TemplateError> {
        let is_func = |func: &str| funcs.contains(func) || funcs::is_builtin(func);
        let trees = parser::parse(name, source, &is_func)?;
        Ok(Template {
            name: name.to_string(),
            trees,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Names of the blocks defined alongside the main body
    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().skip(1).map(String::as_str)
    }

    pub fn has_block(&self, name: &str) -> bool {
        name != self.name && self.trees.contains_key(name)
    }

    pub fn execute(&self, data: &Value, funcs: &FuncMap) -> Result<String, TemplateError> {
        self.run(&self.name, data, funcs, 0)
    }

    pub fn execute_block(&self, name: &str, data: &Value, funcs: &FuncMap) -> Result<String, TemplateError> {
        self.run(name, data, funcs, 0)
    }

    pub(crate) fn run(&self, name: &str, data: &Value, funcs: &FuncMap, depth: usize) -> Result<String, TemplateError> {
        if depth > self.options.max_depth {
            return Err(TemplateError::DepthExceeded {
                name: name.to_string(),
                max: self.options.max_depth,
            });
        }
        let tree = self.trees.get(name).ok_or_else(|| TemplateError::UnknownTemplate {
            name: name.to_string(),
            template: self.name.clone(),
        })?;
        trace!(template = %self.name, block = name, depth, "executing");
        Exec::new(self, funcs, depth, &tree.name, data).run(tree, data)
    }
}
