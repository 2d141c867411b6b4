// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Conditional expressions used by `{{if <expr>}}` template markers.
//!
//! The language is deliberately small:
//!
//! - literals: bare words (`bookworm`, `12`, with `\` escaping any
//!   character) and double quoted text (`"two words"`)
//! - variables: `.Environment.Update`, resolved while lexing
//! - `==` / `!=` string comparison
//! - `x in [a, b, c]` list membership
//! - unary `!`, `&&`, `||` and parenthesis grouping
//!
//! Every value is a string. The literals `false` and `0` (and variables
//! resolving to them) are normalized to the empty string, which is the
//! only false value. Precedence, from tightest: grouping, `!`,
//! `==`/`!=`/`in`, `&&`, `||`.
//!
//! There are no ordering comparisons; `<`, `>`, `<=` and `>=` are
//! rejected by the lexer.

use crate::resolve::resolve;
use crate::value::Value;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./cond_test.rs"]
mod cond_test;

const TRUE: &str = "true";

/// Kinds of lexed expression elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    Value,
    Operator,
    Unary,
    GroupStart,
    GroupEnd,
    In,
    ListStart,
    ListEnd,
    Separator,
}

/// A lexed expression element and where it started in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CondElem {
    kind: ElemKind,
    text: String,
    pos: usize,
}

impl CondElem {
    fn new<S: Into<String>>(kind: ElemKind, text: S, pos: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    fn value<S: Into<String>>(text: S, pos: usize) -> Self {
        Self::new(ElemKind::Value, normalize(text.into()), pos)
    }

    fn describe(&self) -> String {
        match self.kind {
            ElemKind::Value if self.text.is_empty() => "false value".to_string(),
            ElemKind::Value => format!("value {:?}", self.text),
            _ => format!("{:?}", self.text),
        }
    }
}

/// `false` and `0` are the spelled out forms of the empty, false value.
fn normalize(text: String) -> String {
    match text.as_str() {
        "false" | "0" => String::new(),
        _ => text,
    }
}

fn truth(value: bool) -> String {
    if value {
        TRUE.to_string()
    } else {
        String::new()
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '[' | ']' | '_')
}

fn is_literal_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-')
}

/// Split `expr` into elements, resolving variables against `context`.
fn lex(expr: &str, context: &Value) -> Result<Vec<CondElem>> {
    let mut elems = Vec::new();
    let mut pos = 0;

    while let Some(c) = expr[pos..].chars().next() {
        let rest = &expr[pos..];
        match c {
            ' ' | '\t' => {
                pos += 1;
            }
            '(' => {
                elems.push(CondElem::new(ElemKind::GroupStart, "(", pos));
                pos += 1;
            }
            ')' => {
                elems.push(CondElem::new(ElemKind::GroupEnd, ")", pos));
                pos += 1;
            }
            '[' => {
                elems.push(CondElem::new(ElemKind::ListStart, "[", pos));
                pos += 1;
            }
            ']' => {
                elems.push(CondElem::new(ElemKind::ListEnd, "]", pos));
                pos += 1;
            }
            ',' => {
                elems.push(CondElem::new(ElemKind::Separator, ",", pos));
                pos += 1;
            }
            _ if ["==", "!=", "&&", "||"].iter().any(|op| rest.starts_with(op)) => {
                elems.push(CondElem::new(ElemKind::Operator, &rest[..2], pos));
                pos += 2;
            }
            '!' => {
                elems.push(CondElem::new(ElemKind::Unary, "!", pos));
                pos += 1;
            }
            '.' => {
                let len = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| !is_variable_char(*c))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let path = &rest[..len];
                let resolved = resolve(path, context).map_err(|err| {
                    Error::expression(format!("{err}"), expr, pos)
                })?;
                elems.push(CondElem::value(resolved, pos));
                pos += len;
            }
            '"' => {
                let (text, len) = lex_quoted(expr, pos)?;
                elems.push(CondElem::value(text, pos));
                pos += len;
            }
            c if is_literal_char(c) || c == '\\' => {
                let (text, len, escaped) = lex_bare(expr, pos)?;
                if text == "in" && !escaped {
                    elems.push(CondElem::new(ElemKind::In, text, pos));
                } else {
                    elems.push(CondElem::value(text, pos));
                }
                pos += len;
            }
            other => {
                return Err(Error::expression(
                    format!("unexpected character {other:?}"),
                    expr,
                    pos,
                ));
            }
        }
    }

    Ok(elems)
}

/// Lex a double quoted literal starting at `start`; returns the unquoted
/// text and the consumed length. `\` escapes the next character.
fn lex_quoted(expr: &str, start: usize) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut chars = expr[start..].char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((text, i + 1)),
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            _ => text.push(c),
        }
    }
    Err(Error::expression("unterminated quoted string", expr, start))
}

/// Lex a bare literal starting at `start`; returns the text, consumed
/// length and whether any character was escaped.
fn lex_bare(expr: &str, start: usize) -> Result<(String, usize, bool)> {
    let rest = &expr[start..];
    let mut text = String::new();
    let mut escaped = false;
    let mut chars = rest.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c == '\\' {
            chars.next();
            let Some((_, next)) = chars.next() else {
                return Err(Error::expression("dangling escape", expr, start + i));
            };
            text.push(next);
            escaped = true;
        } else if is_literal_char(c) {
            text.push(c);
            chars.next();
        } else {
            return Ok((text, i, escaped));
        }
    }
    Ok((text, rest.len(), escaped))
}

/// Precedence climbing over lexed elements, evaluating as it goes.
struct Parser<'a> {
    expr: &'a str,
    elems: Vec<CondElem>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&CondElem> {
        self.elems.get(self.cursor)
    }

    fn next(&mut self) -> Option<CondElem> {
        let elem = self.elems.get(self.cursor).cloned();
        if elem.is_some() {
            self.cursor += 1;
        }
        elem
    }

    fn peek_operator(&self, op: &str) -> bool {
        self.peek()
            .is_some_and(|e| e.kind == ElemKind::Operator && e.text == op)
    }

    fn error_at<M: Into<String>>(&self, message: M, pos: usize) -> Error {
        Error::expression(message, self.expr, pos)
    }

    fn error_at_end<M: Into<String>>(&self, message: M) -> Error {
        self.error_at(message, self.expr.len())
    }

    fn parse_or(&mut self) -> Result<String> {
        let mut left = self.parse_and()?;
        while self.peek_operator("||") {
            self.next();
            let right = self.parse_and()?;
            left = truth(!left.is_empty() || !right.is_empty());
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<String> {
        let mut left = self.parse_equality()?;
        while self.peek_operator("&&") {
            self.next();
            let right = self.parse_equality()?;
            left = truth(!left.is_empty() && !right.is_empty());
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<String> {
        let mut left = self.parse_unary()?;
        loop {
            if self.peek_operator("==") {
                self.next();
                let right = self.parse_unary()?;
                left = truth(left == right);
            } else if self.peek_operator("!=") {
                self.next();
                let right = self.parse_unary()?;
                left = truth(left != right);
            } else if self.peek().is_some_and(|e| e.kind == ElemKind::In) {
                let op = self.next().map(|e| e.pos).unwrap_or_default();
                left = truth(self.parse_list(op)?.contains(&left));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<String> {
        if self.peek().is_some_and(|e| e.kind == ElemKind::Unary) {
            self.next();
            let value = self.parse_unary()?;
            return Ok(truth(value.is_empty()));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<String> {
        let Some(elem) = self.next() else {
            return Err(self.error_at_end("expected a value"));
        };
        match elem.kind {
            ElemKind::Value => Ok(elem.text),
            ElemKind::GroupStart => {
                if let Some(close) = self.peek().filter(|e| e.kind == ElemKind::GroupEnd) {
                    return Err(self.error_at("empty group", close.pos));
                }
                let value = self.parse_or()?;
                match self.next() {
                    Some(e) if e.kind == ElemKind::GroupEnd => Ok(value),
                    Some(e) => Err(self.error_at(
                        format!("expected ')' but found {}", e.describe()),
                        e.pos,
                    )),
                    None => Err(self.error_at("unclosed group", elem.pos)),
                }
            }
            _ => Err(self.error_at(
                format!("expected a value but found {}", elem.describe()),
                elem.pos,
            )),
        }
    }

    /// Parse `[a, b, c]` following an `in` at `op`.
    fn parse_list(&mut self, op: usize) -> Result<Vec<String>> {
        match self.next() {
            Some(e) if e.kind == ElemKind::ListStart => {}
            Some(e) => {
                return Err(self.error_at(
                    format!("expected '[' after 'in' but found {}", e.describe()),
                    e.pos,
                ));
            }
            None => return Err(self.error_at("expected '[' after 'in'", op)),
        }

        let mut items = Vec::new();
        loop {
            match self.next() {
                Some(e) if e.kind == ElemKind::Value => items.push(e.text),
                Some(e) if e.kind == ElemKind::ListEnd && items.is_empty() => {
                    return Err(self.error_at("empty list", e.pos));
                }
                Some(e) => {
                    return Err(self.error_at(
                        format!("expected a list element but found {}", e.describe()),
                        e.pos,
                    ));
                }
                None => return Err(self.error_at_end("unterminated list")),
            }
            match self.next() {
                Some(e) if e.kind == ElemKind::Separator => continue,
                Some(e) if e.kind == ElemKind::ListEnd => return Ok(items),
                Some(e) => {
                    return Err(self.error_at(
                        format!("expected ',' or ']' but found {}", e.describe()),
                        e.pos,
                    ));
                }
                None => return Err(self.error_at_end("unterminated list")),
            }
        }
    }
}

/// Evaluate a conditional expression against `context`.
///
/// Variables are resolved while lexing, so an unknown variable fails the
/// whole expression even if its value would not matter.
pub fn evaluate(expr: &str, context: &Value) -> Result<bool> {
    let elems = lex(expr, context)?;
    if elems.is_empty() {
        return Err(Error::expression("empty expression", expr, 0));
    }

    let mut parser = Parser {
        expr,
        elems,
        cursor: 0,
    };
    let value = parser.parse_or()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error_at(
            format!("unexpected {}", extra.describe()),
            extra.pos,
        ));
    }

    tracing::trace!(%expr, result = !value.is_empty(), "evaluated condition");
    Ok(!value.is_empty())
}
