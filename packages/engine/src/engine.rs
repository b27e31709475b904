//! Engine
//!
//! Registration and rendering. The registry is shared with the runtime
//! functions through an `Arc`, so rendering needs only `&self` and an
//! engine can be shared between threads once its components are
//! registered.

use std::borrow::Cow;
use std::io;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use tagforge_compiler::{is_literal_tag, is_valid_component_name};
use tagforge_template::FuncMap;

use crate::component::{serialize_fields, Component, ComponentDescriptor};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::registry::Registry;
use crate::runtime;

pub struct Engine {
    config: EngineConfig,
    /// Functions supplied by the user
    funcs: FuncMap,
    registry: Arc<Registry>,
    /// `funcs` plus the runtime functions bound to `registry`
    runtime: FuncMap,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(FuncMap::new())
    }
}

impl Engine {
    /// Create an engine whose templates may call `funcs`
    pub fn new(funcs: FuncMap) -> Self {
        Engine::with_config(funcs, EngineConfig::default())
    }

    pub fn with_config(funcs: FuncMap, config: EngineConfig) -> Self {
        let registry = Arc::new(Registry::default());
        let runtime = runtime::build(&funcs, &registry);
        Engine {
            config,
            funcs,
            registry,
            runtime,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register `C` with its template. Tags naming components that are not
    /// registered yet are kept as markup and the template is compiled again
    /// once they are. On error the engine is left unchanged.
    #[instrument(skip_all, fields(component = C::component_name()))]
    pub fn register_component<C: Component>(&mut self, source: &str) -> Result<(), Error> {
        let name = C::component_name();
        check_name(name)?;

        let descriptor = ComponentDescriptor::of::<C>()?;
        let mut registry = Registry::clone(&self.registry);
        registry.register(descriptor, source, &self.config, &self.runtime)?;

        self.registry = Arc::new(registry);
        self.runtime = runtime::build(&self.funcs, &self.registry);
        debug!("registered component");
        Ok(())
    }

    /// Render `component` into `out`
    pub fn render<C: Component>(&self, out: &mut impl io::Write, component: &C) -> Result<(), Error> {
        self.render_with_funcs(out, component, &FuncMap::new())
    }

    pub fn render_to_string<C: Component>(&self, component: &C) -> Result<String, Error> {
        let mut out = Vec::new();
        self.render(&mut out, component)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Render with `funcs` replacing same-named functions for this render
    /// only. Templates are checked against the functions given to
    /// [`Engine::new`], so every name must already exist there.
    #[instrument(skip_all, fields(component = C::component_name()))]
    pub fn render_with_funcs<C: Component>(
        &self,
        out: &mut impl io::Write,
        component: &C,
        funcs: &FuncMap,
    ) -> Result<(), Error> {
        let name = C::component_name();
        let compiled = self.registry.template(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        let descriptor = self.registry.component(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;

        let fields = serialize_fields(component).map_err(|source| Error::Serialize {
            component: name.to_string(),
            source,
        })?;
        let data = descriptor.template_data(serde_json::Value::Object(fields));
        let funcs = self.render_funcs(funcs);

        let output = match compiled.template.execute(&data, &funcs) {
            Ok(output) => output,
            Err(err) => {
                let mut fallback = String::new();
                if !component.recover(&err, &mut fallback) {
                    return Err(Error::Render {
                        component: name.to_string(),
                        source: err,
                    });
                }
                warn!(error = %err, "component recovered from render error");
                fallback
            }
        };
        out.write_all(output.as_bytes())?;
        Ok(())
    }

    fn render_funcs<'a>(&'a self, overrides: &FuncMap) -> Cow<'a, FuncMap> {
        if overrides.is_empty() {
            return Cow::Borrowed(&self.runtime);
        }
        let mut funcs = self.runtime.clone();
        for name in overrides.names() {
            if runtime::is_internal(name) {
                debug!(func = name, "ignoring override of a runtime function");
                continue;
            }
            if let Some(func) = overrides.get(name) {
                funcs.insert_func(name, Arc::clone(func));
            }
        }
        Cow::Owned(funcs)
    }

    /// Names of the registered components, in registration order
    pub fn known_components(&self) -> Vec<&str> {
        self.registry.component_names().collect()
    }

    /// Functions available to templates, including the runtime ones
    pub fn func_map(&self) -> &FuncMap {
        &self.runtime
    }

    /// The template-engine source a component's template was lowered to
    pub fn compiled_source(&self, name: &str) -> Option<&str> {
        self.registry.template(name).map(|compiled| compiled.lowered.as_str())
    }

    /// Component names used as tags before they were registered, each with
    /// the templates waiting on it
    pub fn pending_references(&self) -> Vec<(&str, Vec<&str>)> {
        self.registry
            .graph()
            .missing()
            .map(|(missing, templates)| (missing, templates.collect()))
            .collect()
    }

    /// Unregistered names a component's template still uses as tags
    pub fn forward_references(&self, name: &str) -> Vec<&str> {
        self.registry.forward_references(name).collect()
    }
}

fn check_name(name: &str) -> Result<(), Error> {
    let reason = if !is_valid_component_name(name) {
        "component names start with an upper case letter and contain only letters, digits and underscores"
    } else if is_literal_tag(name) {
        "the name is also a markup tag"
    } else {
        return Ok(());
    };
    Err(Error::Naming {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
