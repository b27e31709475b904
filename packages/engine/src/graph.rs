//! Forward Reference Graph
//!
//! A template that uses a component tag before the component is registered
//! compiles the tag as literal text. The graph records which templates wait
//! on which missing names, so registering a name can recompile exactly the
//! templates waiting on it.

use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Missing name -> templates waiting on it
    waiting: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `template` uses the unregistered name `missing`
    pub fn record(&mut self, missing: &str, template: &str) {
        self.waiting
            .entry(missing.to_string())
            .or_default()
            .insert(template.to_string());
    }

    /// Forget every edge out of `template`, before it is compiled again
    pub fn clear_template(&mut self, template: &str) {
        for templates in self.waiting.values_mut() {
            templates.shift_remove(template);
        }
        self.waiting.retain(|_, templates| !templates.is_empty());
    }

    /// `missing` is now known: remove it and return the templates that were
    /// waiting on it, in the order they started waiting
    pub fn resolve(&mut self, missing: &str) -> IndexSet<String> {
        self.waiting.shift_remove(missing).unwrap_or_default()
    }

    /// Names `template` is still waiting on
    pub fn pending_for<'a>(&'a self, template: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.waiting
            .iter()
            .filter(move |(_, templates)| templates.contains(template))
            .map(|(missing, _)| missing.as_str())
    }

    pub fn is_waiting(&self, template: &str) -> bool {
        self.waiting.values().any(|templates| templates.contains(template))
    }

    /// Every missing name with the templates waiting on it
    pub fn missing(&self) -> impl Iterator<Item = (&str, impl Iterator<Item = &str>)> {
        self.waiting
            .iter()
            .map(|(missing, templates)| (missing.as_str(), templates.iter().map(String::as_str)))
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
