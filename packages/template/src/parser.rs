//! Template Parser
//!
//! Recursive descent over the items from [`lexer::split`]. Each list of
//! nodes is parsed up to the `{{end}}` or `{{else}}` that closes it, and
//! the parser checks variable and function names as it goes, so a template
//! that parses only refers to things that exist.

use indexmap::IndexMap;

use crate::ast::{Branch, Command, Expr, Node, Pipeline, TemplateCall, Tree};
use crate::error::TemplateError;
use crate::lexer::{self, Item, LexError, Lexeme, Token};

/// Why a node list ended
enum Stop {
    Eof,
    End,
    /// `{{else ...}}`, with the tokens after `else`
    Else(Vec<Lexeme>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    With,
    Range,
}

impl Control {
    fn keyword(self) -> &'static str {
        match self {
            Control::If => "if",
            Control::With => "with",
            Control::Range => "range",
        }
    }
}

/// Parse `source` into its main tree (under `name`) and the trees it
/// defines
pub(crate) fn parse(
    name: &str,
    source: &str,
    is_func: &dyn Fn(&str) -> bool,
) -> Result<IndexMap<String, Tree>, TemplateError> {
    let items = lexer::split(source).map_err(|err| lex_error(name, source, err))?;
    let mut parser = Parser {
        name,
        source,
        items,
        pos: 0,
        is_func,
        vars: vec![String::new()],
        nesting: 0,
        range_depth: 0,
        trees: IndexMap::new(),
    };

    let (root, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => {}
        Stop::End => return Err(parser.error(parser.last_offset(), "unexpected {{end}}")),
        Stop::Else(_) => return Err(parser.error(parser.last_offset(), "unexpected {{else}}")),
    }
    let mut trees = IndexMap::with_capacity(parser.trees.len() + 1);
    trees.insert(
        name.to_string(),
        Tree {
            name: name.to_string(),
            root,
        },
    );
    for (define, tree) in parser.trees {
        if define == name {
            return Err(TemplateError::parse(
                name,
                source,
                0,
                format!("template: multiple definition of template {:?}", define),
            ));
        }
        trees.insert(define, tree);
    }
    Ok(trees)
}

fn lex_error(name: &str, source: &str, err: LexError) -> TemplateError {
    TemplateError::parse(name, source, err.offset, err.msg)
}

struct Parser<'a> {
    name: &'a str,
    source: &'a str,
    items: Vec<Item<'a>>,
    pos: usize,
    is_func: &'a dyn Fn(&str) -> bool,
    /// Variables in scope, `$` first
    vars: Vec<String>,
    /// Open control structures
    nesting: usize,
    range_depth: usize,
    trees: IndexMap<String, Tree>,
}

impl<'a> Parser<'a> {
    fn error(&self, offset: usize, msg: impl Into<String>) -> TemplateError {
        TemplateError::parse(self.name, self.source, offset, msg)
    }

    fn last_offset(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|i| self.items.get(i)) {
            Some(Item::Text { offset, .. } | Item::Action { offset, .. }) => *offset,
            None => 0,
        }
    }

    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.get(self.pos).copied() {
            self.pos += 1;
            let (body, offset) = match item {
                Item::Text { text, .. } => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Item::Action { body, offset } => (body, offset),
            };
            let tokens = lexer::lex_action(body, offset)
                .map_err(|err| lex_error(self.name, self.source, err))?;
            let Some(first) = tokens.first() else {
                return Err(self.error(offset, "missing value for command"));
            };

            let keyword = match &first.token {
                Token::Ident(word) => word.as_str(),
                _ => "",
            };
            match keyword {
                "end" => {
                    self.expect_empty(&tokens[1..], "end")?;
                    return Ok((nodes, Stop::End));
                }
                "else" => return Ok((nodes, Stop::Else(tokens[1..].to_vec()))),
                "if" => nodes.push(self.parse_control(Control::If, &tokens[1..], offset)?),
                "with" => nodes.push(self.parse_control(Control::With, &tokens[1..], offset)?),
                "range" => nodes.push(self.parse_control(Control::Range, &tokens[1..], offset)?),
                "define" => self.parse_define(&tokens[1..], offset)?,
                "block" => nodes.push(self.parse_block(&tokens[1..], offset)?),
                "template" => {
                    let (name, pipeline) = self.parse_template_args(&tokens[1..], offset, "template")?;
                    nodes.push(Node::Template(TemplateCall { name, pipeline }));
                }
                "break" | "continue" => {
                    if self.range_depth == 0 {
                        return Err(self.error(offset, format!("{{{{{}}}}} outside {{{{range}}}}", keyword)));
                    }
                    self.expect_empty(&tokens[1..], keyword)?;
                    nodes.push(if keyword == "break" { Node::Break } else { Node::Continue });
                }
                _ => {
                    let pipeline = self.parse_pipeline(&tokens, offset, "command", true)?;
                    nodes.push(Node::Action(pipeline));
                }
            }
        }
        Ok((nodes, Stop::Eof))
    }

    fn expect_empty(&self, tokens: &[Lexeme], context: &str) -> Result<(), TemplateError> {
        match tokens.first() {
            None => Ok(()),
            Some(extra) => Err(self.error(
                extra.offset,
                format!("unexpected {} in {}", extra.token.describe(), context),
            )),
        }
    }

    /// Parse an `if`, `with` or `range` whose pipeline tokens follow the
    /// keyword, through to its `{{end}}`
    fn parse_control(
        &mut self,
        control: Control,
        tokens: &[Lexeme],
        offset: usize,
    ) -> Result<Node, TemplateError> {
        let mark = self.vars.len();
        self.nesting += 1;
        let result = self.parse_control_body(control, tokens, offset);
        self.nesting -= 1;
        self.vars.truncate(mark);
        result
    }

    fn parse_control_body(
        &mut self,
        control: Control,
        tokens: &[Lexeme],
        offset: usize,
    ) -> Result<Node, TemplateError> {
        let pipeline = self.parse_pipeline(tokens, offset, control.keyword(), true)?;
        let max_decl = if control == Control::Range { 2 } else { 1 };
        if pipeline.decl.len() > max_decl {
            return Err(self.error(offset, format!("too many declarations in {}", control.keyword())));
        }

        if control == Control::Range {
            self.range_depth += 1;
        }
        let list = self.parse_list();
        if control == Control::Range {
            self.range_depth -= 1;
        }
        let (body, stop) = list?;

        let else_body = match stop {
            Stop::End => None,
            Stop::Eof => {
                return Err(self.error(self.source.len(), format!("unexpected EOF in {}", control.keyword())));
            }
            Stop::Else(rest) => Some(self.parse_else(control, rest, offset)?),
        };
        let branch = Branch {
            pipeline,
            body,
            else_body,
        };
        Ok(match control {
            Control::If => Node::If(branch),
            Control::With => Node::With(branch),
            Control::Range => Node::Range(branch),
        })
    }

    fn parse_else(
        &mut self,
        control: Control,
        rest: Vec<Lexeme>,
        offset: usize,
    ) -> Result<Vec<Node>, TemplateError> {
        if let Some(first) = rest.first() {
            let chained = match &first.token {
                Token::Ident(word) if word == "if" && control == Control::If => Control::If,
                Token::Ident(word) if word == "with" && control == Control::With => Control::With,
                other => {
                    return Err(self.error(
                        first.offset,
                        format!("unexpected {} in else", other.describe()),
                    ));
                }
            };
            // The chained control consumes the shared {{end}}
            return Ok(vec![self.parse_control(chained, &rest[1..], first.offset)?]);
        }

        let (body, stop) = self.parse_list()?;
        match stop {
            Stop::End => Ok(body),
            Stop::Else(_) => Err(self.error(self.last_offset(), "expected end; found {{else}}")),
            Stop::Eof => Err(self.error(offset, format!("unexpected EOF in {}", control.keyword()))),
        }
    }

    /// `{{define "name"}}body{{end}}`
    fn parse_define(&mut self, tokens: &[Lexeme], offset: usize) -> Result<(), TemplateError> {
        if self.nesting > 0 {
            return Err(self.error(offset, "unexpected {{define}} inside a control structure"));
        }
        let name = match tokens {
            [Lexeme { token: Token::Str(name), .. }] => name.clone(),
            _ => return Err(self.error(offset, "define clause needs exactly one quoted name")),
        };
        let root = self.parse_definition_body(offset, "define")?;
        self.add_tree(name, root, offset)
    }

    /// `{{block "name" pipeline}}body{{end}}`: define `name` and invoke it
    fn parse_block(&mut self, tokens: &[Lexeme], offset: usize) -> Result<Node, TemplateError> {
        let (name, pipeline) = self.parse_template_args(tokens, offset, "block")?;
        let root = self.parse_definition_body(offset, "block")?;
        self.add_tree(name.clone(), root, offset)?;
        Ok(Node::Template(TemplateCall { name, pipeline }))
    }

    /// Parse the body of a definition with a scope of its own
    fn parse_definition_body(&mut self, offset: usize, context: &str) -> Result<Vec<Node>, TemplateError> {
        let vars = std::mem::replace(&mut self.vars, vec![String::new()]);
        let nesting = std::mem::replace(&mut self.nesting, 0);
        let range_depth = std::mem::replace(&mut self.range_depth, 0);
        let list = self.parse_list();
        self.vars = vars;
        self.nesting = nesting;
        self.range_depth = range_depth;

        match list? {
            (root, Stop::End) => Ok(root),
            (_, Stop::Else(_)) => Err(self.error(self.last_offset(), format!("unexpected {{{{else}}}} in {}", context))),
            (_, Stop::Eof) => Err(self.error(offset, format!("unexpected EOF in {}", context))),
        }
    }

    fn add_tree(&mut self, name: String, root: Vec<Node>, offset: usize) -> Result<(), TemplateError> {
        if self.trees.contains_key(&name) {
            return Err(self.error(offset, format!("template: multiple definition of template {:?}", name)));
        }
        self.trees.insert(name.clone(), Tree { name, root });
        Ok(())
    }

    /// `"name" [pipeline]` after `template` or `block`
    fn parse_template_args(
        &mut self,
        tokens: &[Lexeme],
        offset: usize,
        context: &str,
    ) -> Result<(String, Option<Pipeline>), TemplateError> {
        let name = match tokens.first() {
            Some(Lexeme { token: Token::Str(name), .. }) => name.clone(),
            _ => return Err(self.error(offset, format!("{} clause needs a quoted name", context))),
        };
        let pipeline = if tokens.len() > 1 {
            Some(self.parse_pipeline(&tokens[1..], offset, context, false)?)
        } else {
            None
        };
        Ok((name, pipeline))
    }

    /// Parse a pipeline, with an optional leading declaration when
    /// `allow_decl` is set
    fn parse_pipeline(
        &mut self,
        tokens: &[Lexeme],
        offset: usize,
        context: &str,
        allow_decl: bool,
    ) -> Result<Pipeline, TemplateError> {
        let mut pipeline = Pipeline::default();
        let mut rest = tokens;

        if allow_decl {
            if let Some((names, is_assign, after)) = split_declaration(tokens) {
                for name in &names {
                    if is_assign && !self.vars.contains(name) {
                        return Err(self.error(offset, format!("undefined variable \"${}\"", name)));
                    }
                }
                if !is_assign {
                    self.vars.extend(names.iter().cloned());
                }
                pipeline.decl = names;
                pipeline.is_assign = is_assign;
                rest = after;
            }
        }

        if rest.is_empty() {
            return Err(self.error(offset, format!("missing value for {}", context)));
        }
        for stage in split_top_level(rest, |token| *token == Token::Pipe) {
            if stage.is_empty() {
                return Err(self.error(offset, format!("missing command in {}", context)));
            }
            pipeline.commands.push(self.parse_command(stage, offset, context)?);
        }
        Ok(pipeline)
    }

    fn parse_command(&mut self, tokens: &[Lexeme], offset: usize, context: &str) -> Result<Command, TemplateError> {
        let mut args = Vec::new();
        let mut pos = 0;
        while pos < tokens.len() {
            let (expr, next) = self.parse_operand(tokens, pos, offset, context)?;
            args.push(expr);
            pos = next;
        }
        Ok(Command { args })
    }

    /// Parse one operand starting at `tokens[pos]`, returning it and the
    /// position after it
    fn parse_operand(
        &mut self,
        tokens: &[Lexeme],
        pos: usize,
        offset: usize,
        context: &str,
    ) -> Result<(Expr, usize), TemplateError> {
        let lexeme = &tokens[pos];
        let mut next = pos + 1;
        let expr = match &lexeme.token {
            Token::Dot => Expr::Dot,
            Token::Field(first) => {
                let mut chain = vec![first.clone()];
                next = collect_chain(tokens, next, &mut chain);
                Expr::Field(chain)
            }
            Token::Variable(name) => {
                if !self.vars.contains(name) {
                    return Err(self.error(lexeme.offset, format!("undefined variable \"${}\"", name)));
                }
                let mut chain = Vec::new();
                next = collect_chain(tokens, next, &mut chain);
                Expr::Variable {
                    name: name.clone(),
                    chain,
                }
            }
            Token::Ident(word) => match word.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "nil" => Expr::Nil,
                name if (self.is_func)(name) => Expr::Function(name.to_string()),
                name => {
                    return Err(self.error(lexeme.offset, format!("function {:?} not defined", name)));
                }
            },
            Token::Str(value) => Expr::String(value.clone()),
            Token::Char(ch) => Expr::Int(i64::from(u32::from(*ch))),
            Token::Number(text) => parse_number(text)
                .ok_or_else(|| self.error(lexeme.offset, format!("bad number syntax: {:?}", text)))?,
            Token::LeftParen => {
                let close = matching_paren(tokens, pos)
                    .ok_or_else(|| self.error(lexeme.offset, "unclosed left paren"))?;
                let inner = self.parse_pipeline(&tokens[pos + 1..close], lexeme.offset, "parenthesized pipeline", false)?;
                let mut chain = Vec::new();
                next = collect_chain(tokens, close + 1, &mut chain);
                Expr::Pipeline {
                    pipeline: Box::new(inner),
                    chain,
                }
            }
            other => {
                return Err(self.error(
                    lexeme.offset.max(offset),
                    format!("unexpected {} in {}", other.describe(), context),
                ));
            }
        };
        if let Some(stray) = tokens.get(next).filter(|l| !l.spaced && matches!(l.token, Token::Field(_))) {
            return Err(self.error(stray.offset, format!("unexpected {} in operand", stray.token.describe())));
        }
        Ok((expr, next))
    }
}

/// `$a, $b := rest` or `$a = rest`
fn split_declaration(tokens: &[Lexeme]) -> Option<(Vec<String>, bool, &[Lexeme])> {
    let mut names = Vec::new();
    let mut pos = 0;
    loop {
        match tokens.get(pos).map(|l| &l.token) {
            Some(Token::Variable(name)) if !name.is_empty() => names.push(name.clone()),
            _ => return None,
        }
        match tokens.get(pos + 1).map(|l| &l.token) {
            Some(Token::Comma) => pos += 2,
            Some(Token::Declare) => return Some((names, false, &tokens[pos + 2..])),
            Some(Token::Assign) => return Some((names, true, &tokens[pos + 2..])),
            _ => return None,
        }
    }
}

/// Field tokens directly following an operand extend its chain
fn collect_chain(tokens: &[Lexeme], mut pos: usize, chain: &mut Vec<String>) -> usize {
    while let Some(Lexeme {
        token: Token::Field(field),
        spaced: false,
        ..
    }) = tokens.get(pos)
    {
        chain.push(field.clone());
        pos += 1;
    }
    pos
}

fn matching_paren(tokens: &[Lexeme], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, lexeme) in tokens.iter().enumerate().skip(open) {
        match lexeme.token {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split at separators outside parentheses
fn split_top_level(tokens: &[Lexeme], is_separator: impl Fn(&Token) -> bool) -> Vec<&[Lexeme]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, lexeme) in tokens.iter().enumerate() {
        match lexeme.token {
            Token::LeftParen => depth += 1,
            Token::RightParen => depth = depth.saturating_sub(1),
            ref token if depth == 0 && is_separator(token) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

fn parse_number(text: &str) -> Option<Expr> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };
    let radix = match digits.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    let magnitude = match radix {
        Some(radix) => i64::from_str_radix(&digits[2..], radix).ok(),
        None if digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit()) => {
            i64::from_str_radix(&digits[1..], 8).ok()
        }
        None => digits.parse::<i64>().ok(),
    };
    if let Some(value) = magnitude {
        return Some(Expr::Int(if negative { -value } else { value }));
    }
    cleaned.parse::<f64>().ok().map(Expr::Float)
}
