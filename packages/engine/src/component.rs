//! Components
//!
//! A component is a serializable type with a template. Attributes written on
//! a component tag are bound onto its serialized fields, and the result is
//! deserialized back into the type, so serde decides what a field accepts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use tagforge_template::{Html, Value};

use crate::error::Error;

pub trait Component: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Tag name of the component: the type name without its path or
    /// generic arguments
    fn component_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// `(attribute, field)` pairs for attributes whose name differs from
    /// the serialized field name
    fn attribute_aliases() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Serialized field that receives the rendered children
    fn children_field() -> Option<&'static str> {
        Some("Children")
    }

    /// Called when rendering the component fails. Returning `true` means
    /// `out` holds replacement output and the error is swallowed.
    fn recover(&self, _err: &dyn StdError, _out: &mut dyn fmt::Write) -> bool {
        false
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

type Validate = fn(Json) -> Result<Json, serde_json::Error>;
type Recover = fn(&Json, &dyn StdError, &mut dyn fmt::Write) -> bool;

/// Everything the engine needs to instantiate a component type by name
pub(crate) struct ComponentDescriptor {
    name: &'static str,
    defaults: Map<String, Json>,
    aliases: &'static [(&'static str, &'static str)],
    children_field: Option<&'static str>,
    validate: Validate,
    recover: Recover,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("fields", &self.defaults.keys().collect::<Vec<_>>())
            .field("children_field", &self.children_field)
            .finish()
    }
}

impl ComponentDescriptor {
    pub(crate) fn of<C: Component>() -> Result<Arc<Self>, Error> {
        let name = C::component_name();
        let defaults = match serialize_fields(&C::default()) {
            Ok(fields) => fields,
            Err(source) => {
                return Err(Error::Serialize {
                    component: name.to_string(),
                    source,
                })
            }
        };
        Ok(Arc::new(ComponentDescriptor {
            name,
            defaults,
            aliases: C::attribute_aliases(),
            children_field: C::children_field(),
            validate: validate::<C>,
            recover: recover::<C>,
        }))
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the component has a field to receive children
    pub(crate) fn accepts_children(&self) -> bool {
        self.children_field.is_some_and(|field| self.defaults.contains_key(field))
    }

    fn field_for<'a>(&self, attribute: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == attribute)
            .map_or(attribute, |(_, field)| *field)
    }

    /// Build the component's field map from a tag's attributes and its
    /// rendered children, starting from the default value
    pub(crate) fn bind(&self, attributes: &Value, children: Option<String>) -> Result<Json, Error> {
        let mut fields = self.defaults.clone();
        let mut assigned = Vec::new();

        match attributes {
            Value::Map(entries) => {
                for (attribute, value) in entries.iter() {
                    let field = self.field_for(attribute);
                    match fields.get_mut(field) {
                        Some(slot) => {
                            *slot = value.to_json();
                            assigned.push(field.to_string());
                        }
                        None => debug!(component = self.name, attribute = %attribute, "ignoring unknown attribute"),
                    }
                }
            }
            Value::Nil => {}
            other => debug!(component = self.name, kind = other.type_name(), "ignoring non-map attributes"),
        }

        if let (Some(field), Some(html)) = (self.children_field, children) {
            if let Some(slot) = fields.get_mut(field) {
                *slot = Json::String(html);
            }
        }

        (self.validate)(Json::Object(fields.clone())).map_err(|err| self.binding_error(&fields, &assigned, err))
    }

    /// Retry each assigned field alone against the defaults to name the one
    /// that does not fit
    fn binding_error(&self, fields: &Map<String, Json>, assigned: &[String], err: serde_json::Error) -> Error {
        let culprit = assigned.iter().find(|field| {
            let mut probe = self.defaults.clone();
            if let Some(value) = fields.get(field.as_str()) {
                probe.insert(field.to_string(), value.clone());
            }
            (self.validate)(Json::Object(probe)).is_err()
        });
        Error::Binding {
            component: self.name.to_string(),
            field: culprit.cloned().unwrap_or_else(|| assigned.join(", ")),
            message: err.to_string(),
        }
    }

    /// Template data for a bound component. The children field holds
    /// rendered markup and is not escaped again.
    pub(crate) fn template_data(&self, fields: Json) -> Value {
        let mut value = Value::from(fields);
        if let (Some(field), Value::Map(entries)) = (self.children_field, &mut value) {
            if let Some(slot) = Arc::make_mut(entries).get_mut(field) {
                if let Value::String(html) = &mut *slot {
                    let html = std::mem::take(html);
                    *slot = Value::Html(Html::new(html));
                }
            }
        }
        value
    }

    /// Run the component's recovery hook on its bound fields
    pub(crate) fn recover(&self, fields: &Json, err: &dyn StdError, out: &mut dyn fmt::Write) -> bool {
        (self.recover)(fields, err, out)
    }
}

/// Serialize a component to its field map
pub(crate) fn serialize_fields<C: Serialize>(component: &C) -> Result<Map<String, Json>, serde_json::Error> {
    match serde_json::to_value(component)? {
        Json::Object(fields) => Ok(fields),
        other => Err(serde::ser::Error::custom(format!(
            "a component must serialize to a map of fields, not {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "a sequence",
        Json::Object(_) => "a map",
    }
}

fn validate<C: Component>(fields: Json) -> Result<Json, serde_json::Error> {
    let component: C = serde_json::from_value(fields)?;
    serde_json::to_value(&component)
}

fn recover<C: Component>(fields: &Json, err: &dyn StdError, out: &mut dyn fmt::Write) -> bool {
    match C::deserialize(fields) {
        Ok(component) => component.recover(err, out),
        Err(_) => false,
    }
}
