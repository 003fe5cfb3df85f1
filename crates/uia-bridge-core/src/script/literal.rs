//! Typed values for generated scripts.
//!
//! Every value taken from a client request enters a script either as a
//! [`Literal`], which renders to an escaped runtime literal, or as a
//! [`Fragment`], a checked sub-expression the client authored in the runtime's
//! own syntax (search criteria).

use std::fmt;

use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
    Array(Vec<Literal>),
    Object(Vec<(String, Literal)>),
}

impl Literal {
    pub fn int(n: i64) -> Self {
        Literal::Number(Number::from(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Literal::Str(s.into())
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => Literal::Number(n.clone()),
            Value::String(s) => Literal::Str(s.clone()),
            Value::Array(items) => Literal::Array(items.iter().map(Literal::from_json).collect()),
            Value::Object(map) => Literal::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Literal::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Literal::Null => out.push_str("null"),
            Literal::Bool(true) => out.push_str("true"),
            Literal::Bool(false) => out.push_str("false"),
            Literal::Number(n) => out.push_str(&n.to_string()),
            Literal::Str(s) => push_quoted(out, s),
            Literal::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.render_into(out);
                }
                out.push(']');
            }
            Literal::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_quoted(out, key);
                    out.push(':');
                    value.render_into(out);
                }
                out.push('}');
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::string(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::int(n)
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("expression is empty")]
    Empty,
    #[error("statement separator ';' outside a string at offset {0}")]
    StatementSeparator(usize),
    #[error("line break outside a string at offset {0}")]
    LineBreak(usize),
    #[error("unbalanced '{0}' at offset {1}")]
    Unbalanced(char, usize),
    #[error("unterminated string literal")]
    UnterminatedString,
}

/// A sub-expression written in the runtime's script syntax.
///
/// The text is inserted verbatim. Construction only checks that it stays a
/// single expression: no `;` or line break outside string literals, brackets
/// balanced, strings terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(expr: impl Into<String>) -> Result<Self, FragmentError> {
        let expr = expr.into();
        check_single_expression(&expr)?;
        Ok(Self(expr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_single_expression(expr: &str) -> Result<(), FragmentError> {
    if expr.trim().is_empty() {
        return Err(FragmentError::Empty);
    }

    let mut open: Vec<(char, usize)> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in expr.char_indices() {
        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            return Err(match quote {
                Some(_) => FragmentError::UnterminatedString,
                None => FragmentError::LineBreak(offset),
            });
        }

        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => quote = Some(c),
            ';' => return Err(FragmentError::StatementSeparator(offset)),
            '(' | '[' | '{' => open.push((c, offset)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match open.pop() {
                    Some((o, _)) if o == expected => {}
                    _ => return Err(FragmentError::Unbalanced(c, offset)),
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(FragmentError::UnterminatedString);
    }
    if let Some((c, offset)) = open.pop() {
        return Err(FragmentError::Unbalanced(c, offset));
    }
    Ok(())
}
