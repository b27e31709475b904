//! Scope Rewriting
//!
//! Content hoisted into a named block runs with the context carrier as its
//! data, so references that reached into the enclosing scope are rewritten
//! to go through the carrier:
//!
//! | source   | rewritten              |
//! |----------|------------------------|
//! | `$name`  | `$.tf__locals__.name`  |
//! | `$`      | `$.tf__root__`         |
//! | `.`      | `$.tf__dot__`          |
//! | `.Field` | `$.tf__dot__.Field`    |
//!
//! The rewriter follows the control structure of the hoisted content:
//! variables declared inside it stay as they are, and `.` inside a
//! `range`/`with` body refers to the rebound item, not the enclosing one.
//! String, raw string and char literals and comments are copied untouched.
//! Carrier paths are left alone, so rewriting is idempotent.

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::emitter::carrier_capture;
use super::{DOT_KEY, LOCALS_KEY, ROOT_KEY};
use crate::chars;
use crate::ml_parser::lexer::{is_comment_action, split_actions, TextPart, ACTION_CLOSE, ACTION_OPEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    If,
    Else,
    End,
    Range,
    With,
    Define,
    Block,
    Template,
    Break,
    Continue,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "range" => Keyword::Range,
            "with" => Keyword::With,
            "define" => Keyword::Define,
            "block" => Keyword::Block,
            "template" => Keyword::Template,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            _ => return None,
        })
    }
}

type Names = SmallVec<[String; 2]>;

/// What the start of an action says about scope
#[derive(Debug, Default)]
struct ActionHeader {
    keyword: Option<Keyword>,
    /// `if` or `with` after `else`
    chained: Option<Keyword>,
    variables: Names,
    /// `=` rather than `:=`
    assigns: bool,
}

impl ActionHeader {
    fn read(body: &str) -> Self {
        let mut rest = body.trim_start();
        if let Some(after) = rest.strip_prefix(chars::MINUS) {
            if after.starts_with(chars::is_whitespace) {
                rest = after.trim_start();
            }
        }

        let mut header = ActionHeader::default();
        if let Some((keyword, after)) = read_keyword(rest) {
            header.keyword = Some(keyword);
            rest = after;
            if keyword == Keyword::Else {
                if let Some((chained, after)) = read_keyword(rest.trim_start()) {
                    header.chained = Some(chained);
                    rest = after;
                }
            }
        }
        if let Some((variables, assigns)) = read_declaration(rest) {
            header.variables = variables;
            header.assigns = assigns;
        }
        header
    }

    fn declares(&self) -> bool {
        !self.variables.is_empty() && !self.assigns
    }
}

fn read_keyword(text: &str) -> Option<(Keyword, &str)> {
    let end = text
        .bytes()
        .position(|b| !b.is_ascii_lowercase())
        .unwrap_or(text.len());
    if end == 0 || text.as_bytes().get(end).is_some_and(|b| chars::is_identifier_byte(*b)) {
        return None;
    }
    Keyword::from_word(&text[..end]).map(|keyword| (keyword, &text[end..]))
}

/// `$a := ...`, `$a, $b := ...` or `$a = ...`
fn read_declaration(text: &str) -> Option<(Names, bool)> {
    let mut names = Names::new();
    let mut rest = text.trim_start();
    loop {
        let after_dollar = rest.strip_prefix(chars::DOLLAR)?;
        let end = ident_end(after_dollar.as_bytes(), 0);
        if end == 0 {
            return None;
        }
        names.push(after_dollar[..end].to_string());
        rest = after_dollar[end..].trim_start();
        match rest.strip_prefix(',') {
            Some(after_comma) => rest = after_comma.trim_start(),
            None => break,
        }
    }
    if rest.starts_with(":=") {
        Some((names, false))
    } else if rest.starts_with('=') && !rest.starts_with("==") {
        Some((names, true))
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct Frame {
    rebinds_dot: bool,
    declared: Names,
}

/// Rewrites the content of one hoisted block. Text must be fed in document
/// order, since control structure is tracked across calls.
#[derive(Debug)]
pub struct ScopeRewriter {
    /// `frames[0]` is the top level of the block
    frames: Vec<Frame>,
    captured: IndexSet<String>,
}

impl Default for ScopeRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeRewriter {
    pub fn new() -> Self {
        ScopeRewriter {
            frames: vec![Frame::default()],
            captured: IndexSet::new(),
        }
    }

    /// Variables from the enclosing scope referenced so far, in order of
    /// first use
    pub fn captured(&self) -> &IndexSet<String> {
        &self.captured
    }

    /// Whether `.` currently refers to an item rebound inside the block
    pub fn dot_rebound(&self) -> bool {
        self.frames.iter().any(|frame| frame.rebinds_dot)
    }

    /// Whether `$name` was declared inside the block and is still in scope
    pub fn is_block_local(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.declared.iter().any(|declared| declared == name))
    }

    fn capture(&mut self, name: &str) {
        if !self.captured.contains(name) {
            self.captured.insert(name.to_string());
        }
    }

    /// Rewrite template text: literal runs are copied, actions rewritten
    pub fn rewrite_text(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for part in split_actions(text) {
            match part {
                TextPart::Literal(literal) => out.push_str(literal),
                TextPart::Action(action) => out.push_str(&self.rewrite_action(action)),
            }
        }
        out
    }

    /// Rewrite a bare pipeline, such as an attribute expression
    pub fn rewrite_pipeline(&mut self, pipeline: &str) -> String {
        self.rewrite_refs(pipeline, &[])
    }

    /// The carrier to pass to a component nested in this block whose own
    /// content was rewritten by `nested`. That is `$`, this block's
    /// carrier, when it gives the nested content the same view of scope;
    /// otherwise a fresh capture expressed in this block's terms.
    pub fn carrier_for(&mut self, nested: &ScopeRewriter) -> String {
        let shares_scope = !self.dot_rebound()
            && nested.captured.iter().all(|name| !self.is_block_local(name));
        if shares_scope {
            for name in &nested.captured {
                self.capture(name);
            }
            return "$".to_string();
        }
        let capture = carrier_capture(nested.captured.iter().map(String::as_str));
        self.rewrite_refs(&capture, &[])
    }

    fn rewrite_action(&mut self, action: &str) -> String {
        if is_comment_action(action) {
            return action.to_string();
        }
        let inner = action
            .strip_prefix(ACTION_OPEN)
            .and_then(|s| s.strip_suffix(ACTION_CLOSE))
            .unwrap_or(action);
        let header = ActionHeader::read(inner);

        let body = match header.keyword {
            Some(Keyword::End) => {
                if self.frames.len() > 1 {
                    self.frames.pop();
                }
                inner.to_string()
            }
            Some(Keyword::Else) => {
                // The else branch sees the enclosing item again. Variables
                // declared since the opening keyword stay in scope until end.
                let nested = self.frames.len() > 1;
                if nested {
                    if let Some(top) = self.frames.last_mut() {
                        top.rebinds_dot = false;
                    }
                }
                let body = self.rewrite_refs(inner, &header.variables);
                if nested && header.chained.is_some() {
                    if let Some(top) = self.frames.last_mut() {
                        top.rebinds_dot = header.chained == Some(Keyword::With);
                        if header.declares() {
                            top.declared.extend(header.variables.iter().cloned());
                        }
                    }
                }
                body
            }
            Some(keyword @ (Keyword::If | Keyword::Range | Keyword::With | Keyword::Block)) => {
                let body = self.rewrite_refs(inner, &header.variables);
                let declared = if header.declares() { header.variables } else { Names::new() };
                self.frames.push(Frame {
                    rebinds_dot: keyword != Keyword::If,
                    declared,
                });
                body
            }
            Some(Keyword::Define) => {
                self.frames.push(Frame { rebinds_dot: true, declared: Names::new() });
                inner.to_string()
            }
            Some(Keyword::Template | Keyword::Break | Keyword::Continue) | None => {
                if header.declares() {
                    if let Some(top) = self.frames.last_mut() {
                        top.declared.extend(header.variables.iter().cloned());
                    }
                }
                self.rewrite_refs(inner, &header.variables)
            }
        };
        format!("{}{}{}", ACTION_OPEN, body, ACTION_CLOSE)
    }

    /// Rewrite the references in action text. `keep` lists variables
    /// that are being declared or assigned by this action.
    fn rewrite_refs(&mut self, text: &str, keep: &[String]) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() + 16);
        let mut i = 0;
        let mut prev = b' ';

        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'"' | b'\'' | b'`' => {
                    let end = literal_end(bytes, i);
                    out.push_str(&text[i..end]);
                    i = end;
                    prev = b;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = text[i + 2..].find("*/").map_or(text.len(), |p| i + 2 + p + 2);
                    out.push_str(&text[i..end]);
                    i = end;
                    prev = b' ';
                }
                b'$' => {
                    let end = ident_end(bytes, i + 1);
                    let name = &text[i + 1..end];
                    if name.is_empty() {
                        if is_carrier_path(&text[end..]) {
                            out.push('$');
                        } else {
                            out.push_str("$.");
                            out.push_str(ROOT_KEY);
                        }
                        prev = b'$';
                    } else {
                        if keep.iter().any(|kept| kept == name) || self.is_block_local(name) {
                            out.push_str(&text[i..end]);
                        } else {
                            out.push_str("$.");
                            out.push_str(LOCALS_KEY);
                            out.push('.');
                            out.push_str(name);
                            self.capture(name);
                        }
                        prev = b'a';
                    }
                    i = end;
                }
                b'.' if !continues_chain(prev)
                    && !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) =>
                {
                    let end = ident_end(bytes, i + 1);
                    if self.dot_rebound() {
                        out.push_str(&text[i..end]);
                    } else {
                        out.push_str("$.");
                        out.push_str(DOT_KEY);
                        if end > i + 1 {
                            out.push_str(&text[i..end]);
                        }
                    }
                    i = end;
                    prev = b'a';
                }
                _ => {
                    let ch = text[i..].chars().next().unwrap_or(chars::EOF);
                    out.push(ch);
                    i += ch.len_utf8().max(1);
                    prev = if ch.is_ascii() { b } else { b'a' };
                }
            }
        }
        out
    }
}

/// A `.` after one of these continues a field chain (`$x.A`, `(p).A`,
/// `.A.B`, `1.5`) instead of starting a reference to the current item
fn continues_chain(prev: u8) -> bool {
    chars::is_identifier_byte(prev) || prev == b')' || prev == b']' || prev == b'$'
}

/// `.tf__root__`, `.tf__dot__` or `.tf__locals__` at the start of `rest`
fn is_carrier_path(rest: &str) -> bool {
    let Some(after_dot) = rest.strip_prefix('.') else {
        return false;
    };
    [ROOT_KEY, DOT_KEY, LOCALS_KEY].iter().any(|key| {
        after_dot.starts_with(key)
            && !after_dot
                .as_bytes()
                .get(key.len())
                .is_some_and(|b| chars::is_identifier_byte(*b))
    })
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && chars::is_identifier_byte(bytes[end]) {
        end += 1;
    }
    end
}

/// End (exclusive) of the literal opening at `start`; the end of the text
/// when it is not closed
fn literal_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let escapes = quote != b'`';
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(text: &str) -> (String, Vec<String>) {
        let mut rewriter = ScopeRewriter::new();
        let out = rewriter.rewrite_text(text);
        (out, rewriter.captured().iter().cloned().collect())
    }

    #[test]
    fn test_literal_text_round_trips() {
        let (out, captured) = rewrite("<p>Price: $5. Done.</p>");
        assert_eq!(out, "<p>Price: $5. Done.</p>");
        assert!(captured.is_empty());
    }

    #[test]
    fn test_variable_becomes_local_lookup() {
        let (out, captured) = rewrite("{{$name}}");
        assert_eq!(out, "{{$.tf__locals__.name}}");
        assert_eq!(captured, vec!["name"]);
    }

    #[test]
    fn test_root_and_dot() {
        assert_eq!(rewrite("{{$}}").0, "{{$.tf__root__}}");
        assert_eq!(rewrite("{{$.Title}}").0, "{{$.tf__root__.Title}}");
        assert_eq!(rewrite("{{.}}").0, "{{$.tf__dot__}}");
        assert_eq!(rewrite("{{.User.Name}}").0, "{{$.tf__dot__.User.Name}}");
    }

    #[test]
    fn test_chains_and_numbers_are_untouched() {
        assert_eq!(rewrite("{{(index .Items 0).Name}}").0, "{{(index $.tf__dot__.Items 0).Name}}");
        assert_eq!(rewrite("{{printf \"%.2f\" 1.5}}").0, "{{printf \"%.2f\" 1.5}}");
        assert_eq!(rewrite("{{$user.Name}}").0, "{{$.tf__locals__.user.Name}}");
    }

    #[test]
    fn test_string_literals_are_untouched() {
        let (out, captured) = rewrite(r#"{{print "$x ." `$y` .A}}"#);
        assert_eq!(out, r#"{{print "$x ." `$y` $.tf__dot__.A}}"#);
        assert!(captured.is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let (once, _) = rewrite("{{$name}} {{.}} {{$}} {{.A.B}}");
        let (twice, _) = rewrite(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_range_rebinds_dot_and_declares() {
        let (out, captured) = rewrite("{{range $i, $v := .Items}}{{$i}}{{.}}{{$v.Name}}{{end}}{{.}}");
        assert_eq!(
            out,
            "{{range $i, $v := $.tf__dot__.Items}}{{$i}}{{.}}{{$v.Name}}{{end}}{{$.tf__dot__}}"
        );
        assert!(captured.is_empty());
    }

    #[test]
    fn test_else_restores_enclosing_item() {
        let (out, _) = rewrite("{{with .A}}{{.}}{{else}}{{.}}{{end}}");
        assert_eq!(out, "{{with $.tf__dot__.A}}{{.}}{{else}}{{$.tf__dot__}}{{end}}");

        let (out, _) = rewrite("{{with .A}}{{.}}{{else with .B}}{{.}}{{end}}");
        assert_eq!(out, "{{with $.tf__dot__.A}}{{.}}{{else with $.tf__dot__.B}}{{.}}{{end}}");
    }

    #[test]
    fn test_declared_variables_stay_local() {
        let (out, captured) = rewrite("{{$x := .A}}{{$x}}{{$y}}");
        assert_eq!(out, "{{$x := $.tf__dot__.A}}{{$x}}{{$.tf__locals__.y}}");
        assert_eq!(captured, vec!["y"]);
    }

    #[test]
    fn test_if_keeps_enclosing_item() {
        let (out, _) = rewrite("{{if .Ok}}{{.Name}}{{end}}");
        assert_eq!(out, "{{if $.tf__dot__.Ok}}{{$.tf__dot__.Name}}{{end}}");
    }

    #[test]
    fn test_trim_markers_are_kept() {
        let (out, _) = rewrite("{{- .Name -}}");
        assert_eq!(out, "{{- $.tf__dot__.Name -}}");
    }

    #[test]
    fn test_comments_are_kept() {
        let (out, _) = rewrite("{{/* .Name $x */}}");
        assert_eq!(out, "{{/* .Name $x */}}");
    }

    #[test]
    fn test_carrier_for_shares_scope() {
        let mut outer = ScopeRewriter::new();
        let mut nested = ScopeRewriter::new();
        nested.rewrite_text("{{$name}}");
        assert_eq!(outer.carrier_for(&nested), "$");
        assert!(outer.captured().contains("name"));
    }

    #[test]
    fn test_carrier_for_inside_range_captures_fresh() {
        let mut outer = ScopeRewriter::new();
        outer.rewrite_text("{{range $item := .Items}}");
        let mut nested = ScopeRewriter::new();
        nested.rewrite_text("{{$item}}{{.}}");
        assert_eq!(
            outer.carrier_for(&nested),
            r#"(__tfDict "tf__dot__" . "tf__root__" $.tf__root__ "tf__locals__" (__tfDict "item" $item))"#
        );
    }
}
