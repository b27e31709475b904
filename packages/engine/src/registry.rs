//! Component Registry
//!
//! Components, their compiled templates and the forward reference graph.
//! Registration works on a copy of the registry; the engine swaps the copy
//! in only when registration and every recompilation it triggers succeed.

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use tagforge_compiler::{compile, ComponentSet};
use tagforge_template::{FuncMap, Template};

use crate::component::ComponentDescriptor;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::graph::DependencyGraph;

/// A component template compiled for the template engine
#[derive(Debug)]
pub(crate) struct CompiledComponent {
    pub(crate) template: Template,
    /// Lowered source the template was parsed from
    pub(crate) lowered: String,
    /// Original source, retained only while the template waits on forward
    /// references
    source: Option<String>,
    forward_references: IndexSet<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Registry {
    components: IndexMap<String, Arc<ComponentDescriptor>>,
    templates: IndexMap<String, Arc<CompiledComponent>>,
    graph: DependencyGraph,
}

impl ComponentSet for Registry {
    fn contains_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }
}

impl Registry {
    pub(crate) fn component(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.components.get(name)
    }

    pub(crate) fn template(&self, name: &str) -> Option<&Arc<CompiledComponent>> {
        self.templates.get(name)
    }

    pub(crate) fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Add or replace a component, then recompile the templates that were
    /// waiting on its name. `funcs` are the function names templates may use.
    #[instrument(skip_all, fields(component = descriptor.name()))]
    pub(crate) fn register(
        &mut self,
        descriptor: Arc<ComponentDescriptor>,
        source: &str,
        config: &EngineConfig,
        funcs: &FuncMap,
    ) -> Result<(), Error> {
        let name = descriptor.name();
        if self.components.insert(name.to_string(), descriptor).is_some() {
            debug!("replacing registered component");
        }
        self.compile_template(name, source, config, funcs)?;
        self.propagate(name, config, funcs)
    }

    fn compile_template(&mut self, name: &str, source: &str, config: &EngineConfig, funcs: &FuncMap) -> Result<(), Error> {
        let compiled = compile(source, &*self, &config.compiler).map_err(|source| Error::Parse {
            template: name.to_string(),
            source,
        })?;
        let template = Template::parse_with_options(name, &compiled.source, funcs, config.template_options())
            .map_err(|source| Error::Compile {
                template: name.to_string(),
                source,
            })?;

        self.graph.clear_template(name);
        for missing in &compiled.forward_references {
            debug!(template = name, missing = %missing, "deferring forward reference");
            self.graph.record(missing, name);
        }

        let retained = compiled.has_forward_references().then(|| source.to_string());
        self.templates.insert(
            name.to_string(),
            Arc::new(CompiledComponent {
                template,
                lowered: compiled.source,
                source: retained,
                forward_references: compiled.forward_references,
            }),
        );
        Ok(())
    }

    /// Recompile every template waiting on `name`. Each waiting template is
    /// compiled once, however many of its references the name settles.
    #[instrument(skip(self, config, funcs))]
    fn propagate(&mut self, name: &str, config: &EngineConfig, funcs: &FuncMap) -> Result<(), Error> {
        for template in self.graph.resolve(name) {
            let Some(source) = self.templates.get(&template).and_then(|compiled| compiled.source.clone()) else {
                warn!(template = %template, "waiting template has no retained source");
                continue;
            };
            debug!(template = %template, "recompiling");
            self.compile_template(&template, &source, config, funcs)
                .map_err(|err| Error::Recompile {
                    template: template.clone(),
                    source: Box::new(err),
                })?;
        }
        Ok(())
    }

    /// Forward references recorded when `name` was last compiled
    pub(crate) fn forward_references(&self, name: &str) -> impl Iterator<Item = &str> {
        self.templates
            .get(name)
            .into_iter()
            .flat_map(|compiled| compiled.forward_references.iter().map(String::as_str))
    }
}
