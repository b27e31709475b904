//! Template Functions
//!
//! User functions live in a [`FuncMap`]; the builtins below are always
//! available and can be shadowed by a user function of the same name.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::fmt::{self, Write};
use std::sync::Arc;

use crate::error::{FuncError, TemplateError};
use crate::template::Template;
use crate::value::{Html, Value};

/// A template function
pub type Func = Arc<dyn Fn(&Call<'_>, &[Value]) -> Result<Value, FuncError> + Send + Sync>;

/// Context handed to a function call: the template being executed, the
/// functions in effect and the current depth
pub struct Call<'a> {
    pub(crate) template: &'a Template,
    pub(crate) funcs: &'a FuncMap,
    pub(crate) depth: usize,
}

impl<'a> Call<'a> {
    pub fn template(&self) -> &'a Template {
        self.template
    }

    pub fn funcs(&self) -> &'a FuncMap {
        self.funcs
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Execute a named block of the current template one level deeper
    pub fn execute_block(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        self.template.run(name, data, self.funcs, self.depth + 1)
    }

    /// Execute another template one level deeper, with the same functions
    pub fn execute(&self, template: &Template, data: &Value) -> Result<String, TemplateError> {
        template.run(template.name(), data, self.funcs, self.depth + 1)
    }
}

/// Named functions available to templates
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: IndexMap<String, Func>,
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function that only needs its arguments
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.insert_func(name, Arc::new(move |_: &Call<'_>, args: &[Value]| func(args)))
    }

    /// Add a function that needs the call context
    pub fn insert_with_call<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Call<'_>, &[Value]) -> Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.insert_func(name, Arc::new(func))
    }

    pub fn insert_func(&mut self, name: impl Into<String>, func: Func) -> &mut Self {
        self.funcs.insert(name.into(), func);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Func> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Add every function of `other`, replacing same-named ones
    pub fn extend(&mut self, other: &FuncMap) {
        for (name, func) in &other.funcs {
            self.funcs.insert(name.clone(), Arc::clone(func));
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

static BUILTINS: Lazy<FuncMap> = Lazy::new(|| {
    let mut funcs = FuncMap::new();
    funcs
        .insert("and", |args| Ok(and_or(args, false)))
        .insert("or", |args| Ok(and_or(args, true)))
        .insert("not", |args| match args {
            [value] => Ok(Value::Bool(!value.is_truthy())),
            _ => Err(wrong_args("not", 1, args.len())),
        })
        .insert("len", builtin_len)
        .insert("index", builtin_index)
        .insert("slice", builtin_slice)
        .insert("print", |args| Ok(Value::String(sprint(args))))
        .insert("println", |args| Ok(Value::String(sprintln(args))))
        .insert("printf", builtin_printf)
        .insert("html", |args| Ok(Value::Html(Html::new(html_escape(&eval_args(args))))))
        .insert("urlquery", |args| Ok(Value::String(url_query_escape(&eval_args(args)))))
        .insert("js", |args| Ok(Value::String(js_escape(&eval_args(args)))))
        .insert("eq", builtin_eq)
        .insert("ne", |args| match args {
            [a, b] => Ok(Value::Bool(!values_equal(a, b)?)),
            _ => Err(wrong_args("ne", 2, args.len())),
        })
        .insert("lt", |args| compare(args, "lt", |o| o.is_lt()))
        .insert("le", |args| compare(args, "le", |o| o.is_le()))
        .insert("gt", |args| compare(args, "gt", |o| o.is_gt()))
        .insert("ge", |args| compare(args, "ge", |o| o.is_ge()));
    funcs
});

/// Look up a builtin function
pub fn builtin(name: &str) -> Option<&'static Func> {
    BUILTINS.get(name)
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(name)
}

fn wrong_args(name: &str, want: usize, got: usize) -> FuncError {
    FuncError::msg(format!("wrong number of args for {}: want {} got {}", name, want, got))
}

/// `and` returns the first false argument or the last; `or` the first true
/// argument or the last
fn and_or(args: &[Value], want: bool) -> Value {
    for arg in args {
        if arg.is_truthy() == want {
            return arg.clone();
        }
    }
    args.last().cloned().unwrap_or(Value::Nil)
}

fn builtin_len(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = args else {
        return Err(wrong_args("len", 1, args.len()));
    };
    let len = match value {
        Value::String(s) => s.len(),
        Value::Html(h) => h.as_str().len(),
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => return Err(FuncError::msg(format!("len of type {}", other.type_name()))),
    };
    Ok(Value::Int(len as i64))
}

fn builtin_index(args: &[Value]) -> Result<Value, FuncError> {
    let Some((item, indexes)) = args.split_first() else {
        return Err(FuncError::msg("index of untyped nil"));
    };
    let mut current = item.clone();
    for index in indexes {
        current = match (&current, index) {
            (Value::List(items), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| FuncError::msg(format!("index out of range: {}", i)))?,
            (Value::String(s), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.as_bytes().get(i))
                .map(|b| Value::Int(i64::from(*b)))
                .ok_or_else(|| FuncError::msg(format!("index out of range: {}", i)))?,
            (Value::Map(entries), key) => {
                let key = key
                    .as_str()
                    .ok_or_else(|| FuncError::msg(format!("cannot index map with {}", key.type_name())))?;
                entries.get(key).cloned().unwrap_or(Value::Nil)
            }
            (Value::Nil, _) => return Err(FuncError::msg("index of untyped nil")),
            (item, index) => {
                return Err(FuncError::msg(format!(
                    "can't index item of type {} with {}",
                    item.type_name(),
                    index.type_name()
                )))
            }
        };
    }
    Ok(current)
}

fn builtin_slice(args: &[Value]) -> Result<Value, FuncError> {
    let Some((item, bounds)) = args.split_first() else {
        return Err(FuncError::msg("slice of untyped nil"));
    };
    if bounds.len() > 2 {
        return Err(FuncError::msg(format!("too many slice indexes: {}", bounds.len())));
    }
    let len = match item {
        Value::String(s) => s.len(),
        Value::List(items) => items.len(),
        other => return Err(FuncError::msg(format!("can't slice item of type {}", other.type_name()))),
    };
    let mut indexes = [0, len];
    for (slot, bound) in indexes.iter_mut().zip(bounds) {
        *slot = bound
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| FuncError::msg(format!("cannot slice with {}", bound.type_name())))?;
    }
    let [start, end] = indexes;
    if start > end || end > len {
        return Err(FuncError::msg(format!("slice index out of range: [{}:{}]", start, end)));
    }
    match item {
        Value::String(s) => s
            .get(start..end)
            .map(Value::from)
            .ok_or_else(|| FuncError::msg("slice splits a character")),
        Value::List(items) => Ok(Value::list(items[start..end].iter().cloned())),
        _ => Ok(Value::Nil),
    }
}

fn builtin_eq(args: &[Value]) -> Result<Value, FuncError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(FuncError::msg("missing argument for comparison"));
    };
    if rest.is_empty() {
        return Err(FuncError::msg("missing argument for comparison"));
    }
    for other in rest {
        if values_equal(first, other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, FuncError> {
    Ok(match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Nil, _) | (_, Value::Nil) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a.as_float() == b.as_float(),
        (Value::String(_) | Value::Html(_), Value::String(_) | Value::Html(_)) => a.as_str() == b.as_str(),
        (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => {
            return Err(FuncError::msg(format!(
                "non-comparable type {}",
                if matches!(a, Value::List(_) | Value::Map(_)) { a.type_name() } else { b.type_name() }
            )))
        }
        _ => return Err(FuncError::msg("incompatible types for comparison")),
    })
}

fn compare(args: &[Value], name: &str, test: fn(std::cmp::Ordering) -> bool) -> Result<Value, FuncError> {
    let [a, b] = args else {
        return Err(wrong_args(name, 2, args.len()));
    };
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
            x.partial_cmp(&y)
                .ok_or_else(|| FuncError::msg("incompatible types for comparison"))?
        }
        (Value::String(_) | Value::Html(_), Value::String(_) | Value::Html(_)) => a.as_str().cmp(&b.as_str()),
        _ => {
            return Err(FuncError::msg(format!(
                "invalid type for comparison: {} and {}",
                a.type_name(),
                b.type_name()
            )))
        }
    };
    Ok(Value::Bool(test(ordering)))
}

/// Go's `fmt.Sprint`: spaces go between operands when neither is a string
pub fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_string = arg.as_str().is_some();
        if i > 0 && !is_string && args[i - 1].as_str().is_none() {
            out.push(' ');
        }
        let _ = write!(out, "{}", arg);
    }
    out
}

fn sprintln(args: &[Value]) -> String {
    let mut out = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
    out.push('\n');
    out
}

/// The argument text of the escaping functions: a lone string as is,
/// anything else printed with [`sprint`]
fn eval_args(args: &[Value]) -> String {
    match args {
        [value] => value.as_str().map_or_else(|| value.to_string(), str::to_string),
        _ => sprint(args),
    }
}

/// Escape text for HTML, the way Go's `html` builtin does
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn url_query_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for b in text.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn js_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn builtin_printf(args: &[Value]) -> Result<Value, FuncError> {
    let Some((format, rest)) = args.split_first() else {
        return Err(wrong_args("printf", 1, 0));
    };
    let format = format
        .as_str()
        .ok_or_else(|| FuncError::msg(format!("printf format must be a string, got {}", format.type_name())))?;
    Ok(Value::String(sprintf(format, rest)))
}

/// Go's `fmt.Sprintf` for the verbs templates commonly use: `%v %s %d %q
/// %f %e %g %t %x %X %c` with flags, width and precision
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        spec.width = read_digits(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_digits(&mut chars).unwrap_or(0));
        }
        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match args.next() {
            Some(arg) => {
                let text = format_verb(verb, &spec, arg);
                out.push_str(&spec.pad(text, matches!(arg, Value::Int(_) | Value::Float(_))));
            }
            None => {
                let _ = write!(out, "%!{}(MISSING)", verb);
            }
        }
    }
    let extra: Vec<Value> = args.cloned().collect();
    if !extra.is_empty() {
        out.push_str("%!(EXTRA ");
        let described: Vec<String> = extra.iter().map(|v| format!("{}={}", v.type_name(), v)).collect();
        out.push_str(&described.join(", "));
        out.push(')');
    }
    out
}

#[derive(Default)]
struct Spec {
    left: bool,
    plus: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    fn pad(&self, text: String, numeric: bool) -> String {
        let Some(width) = self.width else {
            return text;
        };
        let len = text.chars().count();
        if len >= width {
            return text;
        }
        let fill = width - len;
        if self.left {
            format!("{}{}", text, " ".repeat(fill))
        } else if self.zero && numeric {
            match text.strip_prefix('-') {
                Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
                None => format!("{}{}", "0".repeat(fill), text),
            }
        } else {
            format!("{}{}", " ".repeat(fill), text)
        }
    }
}

fn read_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0) * 10 + digit as usize);
        chars.next();
    }
    value
}

fn format_verb(verb: char, spec: &Spec, arg: &Value) -> String {
    let signed = |text: String, negative: bool| {
        if spec.plus && !negative {
            format!("+{}", text)
        } else {
            text
        }
    };
    match (verb, arg) {
        ('v', Value::Float(f)) | ('g', Value::Float(f)) => match spec.precision {
            Some(p) => signed(format!("{:.*}", p, f), *f < 0.0),
            None => signed(f.to_string(), *f < 0.0),
        },
        ('v', value) | ('s', value) => {
            let text = value.to_string();
            match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        ('d', Value::Int(i)) => signed(i.to_string(), *i < 0),
        ('f' | 'F', value) if value.as_float().is_some() => {
            let f = value.as_float().unwrap_or(0.0);
            signed(format!("{:.*}", spec.precision.unwrap_or(6), f), f < 0.0)
        }
        ('e', value) if value.as_float().is_some() => {
            let f = value.as_float().unwrap_or(0.0);
            signed(go_exponent(format!("{:.*e}", spec.precision.unwrap_or(6), f)), f < 0.0)
        }
        ('t', Value::Bool(b)) => b.to_string(),
        ('q', value) if value.as_str().is_some() => format!("{:?}", value.as_str().unwrap_or_default()),
        ('q', Value::Int(i)) => char::from_u32(*i as u32).map_or_else(|| format!("%!q(int={})", i), |c| format!("{:?}", c)),
        ('x', Value::Int(i)) => format!("{:x}", i),
        ('X', Value::Int(i)) => format!("{:X}", i),
        ('x', value) if value.as_str().is_some() => value
            .as_str()
            .unwrap_or_default()
            .bytes()
            .map(|b| format!("{:02x}", b))
            .collect(),
        ('c', Value::Int(i)) => char::from_u32(*i as u32).map(String::from).unwrap_or_default(),
        (verb, value) => format!("%!{}({}={})", verb, value.type_name(), value),
    }
}

/// Rust prints `1.5e3`, Go `1.5e+03`
fn go_exponent(text: String) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}
