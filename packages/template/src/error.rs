//! Template Errors

use thiserror::Error;

/// Failure to parse or execute a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template: {name}:{line}: {msg}")]
    Parse {
        name: String,
        offset: usize,
        line: usize,
        msg: String,
    },

    #[error("template: {name}: {msg}")]
    Exec { name: String, msg: String },

    #[error("template: {name}: error calling {func}: {msg}")]
    Func {
        name: String,
        func: String,
        msg: String,
    },

    #[error("template: {name}: exceeded maximum template depth ({max})")]
    DepthExceeded { name: String, max: usize },

    #[error("template: no template {name:?} associated with template {template:?}")]
    UnknownTemplate { name: String, template: String },
}

impl TemplateError {
    pub(crate) fn parse(name: &str, source: &str, offset: usize, msg: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let line = source.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1;
        TemplateError::Parse {
            name: name.to_string(),
            offset,
            line,
            msg: msg.into(),
        }
    }

    pub(crate) fn exec(name: &str, msg: impl Into<String>) -> Self {
        TemplateError::Exec {
            name: name.to_string(),
            msg: msg.into(),
        }
    }

    /// Name of the template the error was raised in
    pub fn template_name(&self) -> &str {
        match self {
            TemplateError::Parse { name, .. }
            | TemplateError::Exec { name, .. }
            | TemplateError::Func { name, .. }
            | TemplateError::DepthExceeded { name, .. } => name,
            TemplateError::UnknownTemplate { template, .. } => template,
        }
    }
}

/// Error returned by a template function
#[derive(Debug, Error)]
pub enum FuncError {
    #[error("{0}")]
    Message(String),

    /// A template executed by the function failed. It is passed through
    /// unchanged rather than wrapped in a call error.
    #[error(transparent)]
    Template(Box<TemplateError>),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl FuncError {
    pub fn msg(msg: impl Into<String>) -> Self {
        FuncError::Message(msg.into())
    }
}

impl From<TemplateError> for FuncError {
    fn from(err: TemplateError) -> Self {
        FuncError::Template(Box::new(err))
    }
}
