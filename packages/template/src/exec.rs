//! Template Execution
//!
//! Walks a parsed tree against a data value. Variables live on a single
//! stack: `$` sits at the bottom, and every control structure truncates the
//! stack back to where it started when it ends.

use crate::ast::{Branch, Command, Expr, Node, Pipeline, TemplateCall, Tree};
use crate::error::{FuncError, TemplateError};
use crate::funcs::{self, Call, FuncMap};
use crate::template::Template;
use crate::value::Value;

/// How a node list finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

pub(crate) struct Exec<'a> {
    template: &'a Template,
    funcs: &'a FuncMap,
    depth: usize,
    name: &'a str,
    vars: Vec<(String, Value)>,
    out: String,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(template: &'a Template, funcs: &'a FuncMap, depth: usize, name: &'a str, data: &Value) -> Self {
        Exec {
            template,
            funcs,
            depth,
            name,
            vars: vec![(String::new(), data.clone())],
            out: String::new(),
        }
    }

    pub(crate) fn run(mut self, tree: &Tree, data: &Value) -> Result<String, TemplateError> {
        self.walk(data, &tree.root)?;
        Ok(self.out)
    }

    fn error(&self, msg: impl Into<String>) -> TemplateError {
        TemplateError::exec(self.name, msg)
    }

    fn walk(&mut self, dot: &Value, nodes: &[Node]) -> Result<Flow, TemplateError> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.out.push_str(text);
                    Flow::Normal
                }
                Node::Action(pipeline) => {
                    let value = self.eval_pipeline(dot, pipeline)?;
                    if pipeline.decl.is_empty() {
                        self.print(&value);
                    } else {
                        self.declare(pipeline, value)?;
                    }
                    Flow::Normal
                }
                Node::If(branch) => self.walk_if(dot, branch)?,
                Node::With(branch) => self.walk_with(dot, branch)?,
                Node::Range(branch) => self.walk_range(dot, branch)?,
                Node::Template(call) => {
                    self.walk_template(dot, call)?;
                    Flow::Normal
                }
                Node::Break => Flow::Break,
                Node::Continue => Flow::Continue,
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `nodes` in a fresh variable scope
    fn walk_scoped(&mut self, dot: &Value, nodes: &[Node], mark: usize) -> Result<Flow, TemplateError> {
        let flow = self.walk(dot, nodes);
        self.vars.truncate(mark);
        flow
    }

    fn walk_if(&mut self, dot: &Value, branch: &Branch) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipeline)?;
        self.declare(&branch.pipeline, value.clone())?;
        if value.is_truthy() {
            self.walk_scoped(dot, &branch.body, mark)
        } else if let Some(else_body) = &branch.else_body {
            self.walk_scoped(dot, else_body, mark)
        } else {
            self.vars.truncate(mark);
            Ok(Flow::Normal)
        }
    }

    fn walk_with(&mut self, dot: &Value, branch: &Branch) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipeline)?;
        self.declare(&branch.pipeline, value.clone())?;
        if value.is_truthy() {
            self.walk_scoped(&value, &branch.body, mark)
        } else if let Some(else_body) = &branch.else_body {
            self.walk_scoped(dot, else_body, mark)
        } else {
            self.vars.truncate(mark);
            Ok(Flow::Normal)
        }
    }

    fn walk_range(&mut self, dot: &Value, branch: &Branch) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipeline)?;
        let items: Vec<(Value, Value)> = match &value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Value::Int(i as i64), item.clone()))
                .collect(),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, item)| (Value::String(key.clone()), item.clone()))
                .collect(),
            Value::Int(n) => (0..*n).map(|i| (Value::Int(i), Value::Int(i))).collect(),
            Value::Nil => Vec::new(),
            other => return Err(self.error(format!("range can't iterate over {}", other))),
        };

        if items.is_empty() {
            return match &branch.else_body {
                Some(else_body) => self.walk_scoped(dot, else_body, mark),
                None => Ok(Flow::Normal),
            };
        }

        for (key, item) in items {
            self.vars.truncate(mark);
            match branch.pipeline.decl.as_slice() {
                [] => {}
                [elem] => self.vars.push((elem.clone(), item.clone())),
                [index, elem, ..] => {
                    self.vars.push((index.clone(), key));
                    self.vars.push((elem.clone(), item.clone()));
                }
            }
            match self.walk(&item, &branch.body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
            }
        }
        self.vars.truncate(mark);
        Ok(Flow::Normal)
    }

    fn walk_template(&mut self, dot: &Value, call: &TemplateCall) -> Result<(), TemplateError> {
        let data = match &call.pipeline {
            Some(pipeline) => self.eval_pipeline(dot, pipeline)?,
            None => Value::Nil,
        };
        let output = self.template.run(&call.name, &data, self.funcs, self.depth + 1)?;
        self.out.push_str(&output);
        Ok(())
    }

    fn declare(&mut self, pipeline: &Pipeline, value: Value) -> Result<(), TemplateError> {
        let Some(name) = pipeline.decl.first() else {
            return Ok(());
        };
        if !pipeline.is_assign {
            self.vars.push((name.clone(), value));
            return Ok(());
        }
        match self.vars.iter_mut().rev().find(|(var, _)| var == name) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.error(format!("undefined variable: ${}", name))),
        }
    }

    fn variable(&self, name: &str) -> Result<Value, TemplateError> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| self.error(format!("undefined variable: ${}", name)))
    }

    fn print(&mut self, value: &Value) {
        match value {
            Value::Html(html) => self.out.push_str(html.as_str()),
            value if self.template.options().escape_html => {
                self.out.push_str(&funcs::html_escape(&value.to_string()))
            }
            value => self.out.push_str(&value.to_string()),
        }
    }

    fn eval_pipeline(&mut self, dot: &Value, pipeline: &Pipeline) -> Result<Value, TemplateError> {
        let mut value = None;
        for command in &pipeline.commands {
            value = Some(self.eval_command(dot, command, value)?);
        }
        Ok(value.unwrap_or_default())
    }

    fn eval_command(&mut self, dot: &Value, command: &Command, last: Option<Value>) -> Result<Value, TemplateError> {
        let Some((first, args)) = command.args.split_first() else {
            return Err(self.error("empty command"));
        };
        match first {
            Expr::Function(name) => self.call_function(dot, name, args, last),
            other => {
                if !args.is_empty() || last.is_some() {
                    return Err(self.error(format!("can't give argument to non-function {}", describe(other))));
                }
                self.eval_arg(dot, other)
            }
        }
    }

    fn call_function(
        &mut self,
        dot: &Value,
        name: &str,
        args: &[Expr],
        last: Option<Value>,
    ) -> Result<Value, TemplateError> {
        if matches!(name, "and" | "or") && !self.funcs.contains(name) {
            return self.short_circuit(dot, name == "or", args, last);
        }
        let func = self
            .funcs
            .get(name)
            .or_else(|| funcs::builtin(name))
            .cloned()
            .ok_or_else(|| self.error(format!("function {:?} not defined", name)))?;

        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(self.eval_arg(dot, arg)?);
        }
        values.extend(last);

        let call = Call {
            template: self.template,
            funcs: self.funcs,
            depth: self.depth,
        };
        func(&call, &values).map_err(|err| match err {
            FuncError::Template(inner) => *inner,
            other => TemplateError::Func {
                name: self.name.to_string(),
                func: name.to_string(),
                msg: other.to_string(),
            },
        })
    }

    /// `and`/`or` stop evaluating at the first argument that decides the
    /// result
    fn short_circuit(
        &mut self,
        dot: &Value,
        want: bool,
        args: &[Expr],
        last: Option<Value>,
    ) -> Result<Value, TemplateError> {
        if args.is_empty() && last.is_none() {
            return Err(self.error(format!(
                "wrong number of args for {}: want at least 1 got 0",
                if want { "or" } else { "and" }
            )));
        }
        let mut value = Value::Nil;
        for arg in args {
            value = self.eval_arg(dot, arg)?;
            if value.is_truthy() == want {
                return Ok(value);
            }
        }
        Ok(last.unwrap_or(value))
    }

    fn eval_arg(&mut self, dot: &Value, expr: &Expr) -> Result<Value, TemplateError> {
        match expr {
            Expr::Dot => Ok(dot.clone()),
            Expr::Field(chain) => self.field_chain(dot.clone(), chain),
            Expr::Variable { name, chain } => {
                let value = self.variable(name)?;
                self.field_chain(value, chain)
            }
            Expr::Function(name) => self.call_function(dot, name, &[], None),
            Expr::Pipeline { pipeline, chain } => {
                let value = self.eval_pipeline(dot, pipeline)?;
                self.field_chain(value, chain)
            }
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Nil => Ok(Value::Nil),
        }
    }

    /// Missing map keys and fields of nil evaluate to nil
    fn field_chain(&self, mut value: Value, chain: &[String]) -> Result<Value, TemplateError> {
        for field in chain {
            value = match &value {
                Value::Map(entries) => entries.get(field).cloned().unwrap_or_default(),
                Value::Nil => Value::Nil,
                other => {
                    return Err(self.error(format!(
                        "can't evaluate field {} in type {}",
                        field,
                        other.type_name()
                    )))
                }
            };
        }
        Ok(value)
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Dot => ".".to_string(),
        Expr::Field(chain) => format!(".{}", chain.join(".")),
        Expr::Variable { name, chain } if chain.is_empty() => format!("${}", name),
        Expr::Variable { name, chain } => format!("${}.{}", name, chain.join(".")),
        Expr::Function(name) => name.clone(),
        Expr::Pipeline { .. } => "pipeline".to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Int(i) => i.to_string(),
        Expr::Float(f) => f.to_string(),
        Expr::String(s) => format!("{:?}", s),
        Expr::Nil => "nil".to_string(),
    }
}
