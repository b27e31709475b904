//! Host Source Emitter
//!
//! Builders for the fragments of host-engine source the lowering emits

use std::fmt::Write;

use super::{CONCAT_FUNC, DICT_FUNC, DOT_KEY, LOCALS_KEY, RENDER_COMPONENT_FUNC, ROOT_KEY};

/// Quote `value` as an interpreted host string literal
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// `(__tfDict "k1" v1 "k2" v2)`; values are host expressions
pub fn dict<'e, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'e str, String)>,
{
    let mut source = format!("({}", DICT_FUNC);
    for (key, value) in entries {
        source.push(' ');
        source.push_str(&quote_string(key));
        source.push(' ');
        source.push_str(&value);
    }
    source.push(')');
    source
}

/// `(__tfConcat part ...)`; parts are host expressions
pub fn concat(parts: &[String]) -> String {
    let mut source = format!("({}", CONCAT_FUNC);
    for part in parts {
        source.push(' ');
        source.push_str(part);
    }
    source.push(')');
    source
}

/// The context carrier capturing the current item, the root and the named
/// variables, as seen from where the expression is evaluated
pub fn carrier_capture<'n, I>(locals: I) -> String
where
    I: IntoIterator<Item = &'n str>,
{
    let locals = dict(locals.into_iter().map(|name| (name, format!("${}", name))));
    dict([
        (DOT_KEY, ".".to_string()),
        (ROOT_KEY, "$".to_string()),
        (LOCALS_KEY, locals),
    ])
}

/// `{{__tfRenderComponent "Name" "block" ATTRS CARRIER}}`
pub fn call_out(name: &str, block_id: &str, attributes: &str, carrier: &str) -> String {
    format!(
        "{{{{{} {} {} {} {}}}}}",
        RENDER_COMPONENT_FUNC,
        quote_string(name),
        quote_string(block_id),
        attributes,
        carrier
    )
}

/// `{{define "id"}}body{{end}}`
pub fn define_block(block_id: &str, body: &str) -> String {
    format!("{{{{define {}}}}}{}{{{{end}}}}", quote_string(block_id), body)
}
