//! Template AST

/// A parsed template body
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub name: String,
    pub root: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{pipeline}}`; prints its value unless the pipeline declares
    Action(Pipeline),
    If(Branch),
    With(Branch),
    Range(Branch),
    /// `{{template "name" pipeline}}`, also produced by `{{block}}`
    Template(TemplateCall),
    Break,
    Continue,
}

/// The shared shape of `if`, `with` and `range`. An `else if` chain is an
/// else body holding a single nested node.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub pipeline: Pipeline,
    pub body: Vec<Node>,
    pub else_body: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCall {
    pub name: String,
    pub pipeline: Option<Pipeline>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    /// Declared or assigned variables, without `$`
    pub decl: Vec<String>,
    /// `=` rather than `:=`
    pub is_assign: bool,
    pub commands: Vec<Command>,
}

/// One stage of a pipeline. When the first argument is a function the
/// rest are its arguments; the result of the previous stage is passed as
/// the final argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.`
    Dot,
    /// `.A.B`, a chain on `.`
    Field(Vec<String>),
    /// `$` (empty name) or `$x`, with an optional field chain
    Variable { name: String, chain: Vec<String> },
    Function(String),
    /// `(pipeline)` with an optional field chain
    Pipeline {
        pipeline: Box<Pipeline>,
        chain: Vec<String>,
    },
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Nil,
}
