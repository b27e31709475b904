//! Engine Errors

use tagforge_compiler::ParseError;
use tagforge_template::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The component's type name cannot be used as a tag
    #[error("invalid component name {name:?}: {reason}")]
    Naming { name: String, reason: String },

    /// The component markup in a template is malformed
    #[error("could not parse template {template}: {source}")]
    Parse {
        template: String,
        source: ParseError,
    },

    /// The lowered template was rejected by the template engine
    #[error("could not compile template {template}: {source}")]
    Compile {
        template: String,
        source: TemplateError,
    },

    /// A template waiting on the registered component failed to compile
    /// once the component became known
    #[error("could not recompile template {template}: {source}")]
    Recompile {
        template: String,
        source: Box<Error>,
    },

    #[error("no component found for type {name}")]
    NotFound { name: String },

    #[error("error rendering component {component}: {source}")]
    Render {
        component: String,
        source: TemplateError,
    },

    /// An attribute value does not fit the field it is assigned to
    #[error("cannot bind attribute {field:?} of component {component}: {message}")]
    Binding {
        component: String,
        field: String,
        message: String,
    },

    /// The component value has no map representation
    #[error("could not serialize component {component}: {source}")]
    Serialize {
        component: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
