//! Render Runtime
//!
//! The functions compiled component templates call into: the dictionary
//! and concatenation helpers used to build attributes and context carriers,
//! and the component call-out itself.

use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use tagforge_compiler::lowering::{CONCAT_FUNC, DICT_FUNC, RENDER_COMPONENT_FUNC};
use tagforge_template::{Call, FuncError, FuncMap, Html, Value};

use crate::error::Error;
use crate::registry::Registry;

/// Build a map from alternating keys and values, as the `__tfDict`
/// template function does
///
/// ```
/// use tagforge::{dict, Value};
///
/// let attributes = dict(&[Value::from("Name"), Value::from("Fox")]).unwrap();
/// assert_eq!(attributes.get("Name"), Some(&Value::from("Fox")));
/// assert!(dict(&[Value::from("Name")]).is_err());
/// ```
pub fn dict(pairs: &[Value]) -> Result<Value, FuncError> {
    if pairs.len() % 2 != 0 {
        return Err(FuncError::msg(format!(
            "invalid number of arguments to dict: {}",
            pairs.len()
        )));
    }
    let mut entries = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| FuncError::msg(format!("dict keys must be strings, got {}", pair[0].type_name())))?;
        entries.push((key.to_string(), pair[1].clone()));
    }
    Ok(Value::map(entries))
}

fn concat(parts: &[Value]) -> Result<Value, FuncError> {
    let mut text = String::new();
    for part in parts {
        let _ = write!(text, "{}", part);
    }
    Ok(Value::String(text))
}

/// Functions for executing component templates: the user's functions plus
/// the internal ones, which cannot be shadowed
pub(crate) fn build(user: &FuncMap, registry: &Arc<Registry>) -> FuncMap {
    let mut funcs = user.clone();
    funcs.insert(DICT_FUNC, dict).insert(CONCAT_FUNC, concat);
    let registry = Arc::clone(registry);
    funcs.insert_with_call(RENDER_COMPONENT_FUNC, move |call, args| {
        render_component(&registry, call, args)
    });
    funcs
}

pub(crate) fn is_internal(name: &str) -> bool {
    matches!(name, DICT_FUNC | CONCAT_FUNC | RENDER_COMPONENT_FUNC)
}

/// `__tfRenderComponent NAME BLOCK ATTRIBUTES CARRIER`: render the children
/// block with the carrier, bind the component and render its template
#[instrument(skip_all, fields(component, depth = call.depth()))]
fn render_component(registry: &Registry, call: &Call<'_>, args: &[Value]) -> Result<Value, FuncError> {
    let [name, block, attributes, carrier] = args else {
        return Err(FuncError::msg(format!(
            "{} expects 4 arguments, got {}",
            RENDER_COMPONENT_FUNC,
            args.len()
        )));
    };
    let name = name
        .as_str()
        .ok_or_else(|| FuncError::msg(format!("component name must be a string, got {}", name.type_name())))?;
    tracing::Span::current().record("component", name);

    let not_found = || FuncError::Other(Box::new(Error::NotFound { name: name.to_string() }));
    let descriptor = registry.component(name).ok_or_else(not_found)?;
    let compiled = registry.template(name).ok_or_else(not_found)?;

    let block = block.as_str().unwrap_or_default();
    let children = if block.is_empty() || !descriptor.accepts_children() {
        None
    } else {
        Some(call.execute_block(block, carrier)?)
    };

    let fields = descriptor
        .bind(attributes, children)
        .map_err(|err| FuncError::Other(Box::new(err)))?;
    let data = descriptor.template_data(fields.clone());
    debug!("rendering nested component");

    match call.execute(&compiled.template, &data) {
        Ok(output) => Ok(Value::Html(Html::new(output))),
        Err(err) => {
            let mut fallback = String::new();
            if descriptor.recover(&fields, &err, &mut fallback) {
                warn!(error = %err, "component recovered from render error");
                Ok(Value::Html(Html::new(fallback)))
            } else {
                Err(err.into())
            }
        }
    }
}
