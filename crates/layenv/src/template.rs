// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Rendering of command argument templates.
//!
//! A command line is a list of tokens. Plain tokens are copied through,
//! while tokens wrapped in `{{ }}` are markers:
//!
//! - `{{if <expr>}}` ... `{{end}}` keeps the enclosed tokens only when
//!   `<expr>` is true (see [`crate::cond`])
//! - `{{.Path}}` is replaced by the resolved variable
//!
//! ```
//! use layenv::{render, Value};
//!
//! let context = Value::new_struct()
//!     .with_field("Environment", Value::new_struct().with_field("Update", false));
//! let tokens = ["apt-get", "{{if .Environment.Update}}", "upgrade", "{{end}}", "-y"];
//! assert_eq!(render(&tokens, &context).unwrap(), vec!["apt-get", "-y"]);
//! ```

use crate::cond::evaluate;
use crate::resolve::resolve;
use crate::value::Value;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./template_test.rs"]
mod template_test;

/// A parsed `{{ }}` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker<'a> {
    If(&'a str),
    End,
    Variable(&'a str),
}

/// Parse a token as a marker. Returns `None` for plain text tokens.
fn parse_marker(token: &str) -> Result<Option<Marker<'_>>> {
    if !token.starts_with("{{") {
        return Ok(None);
    }
    if token.len() < 4 || !token.ends_with("}}") {
        return Err(Error::template("marker must end with '}}'", token));
    }

    let inner = &token[2..token.len() - 2];
    if inner.contains("{{") || inner.contains("}}") {
        return Err(Error::template("markers cannot be nested", token));
    }

    let inner = inner.trim();
    if inner == "end" {
        return Ok(Some(Marker::End));
    }
    if let Some(expr) = inner.strip_prefix("if") {
        if expr.is_empty() {
            return Err(Error::template("missing condition", token));
        }
        if expr.starts_with(char::is_whitespace) {
            return Ok(Some(Marker::If(expr.trim())));
        }
    }
    if inner.starts_with('.') {
        return Ok(Some(Marker::Variable(inner)));
    }
    Err(Error::template("unknown marker", token))
}

/// Expand template `tokens` into plain arguments.
///
/// Tokens inside a false `{{if}}` block are never inspected beyond
/// counting nested `if`/`end` markers, so they cannot fail the render.
pub fn render<S: AsRef<str>>(tokens: &[S], context: &Value) -> Result<Vec<String>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut skip_depth = 0usize;
    let mut if_depth = 0usize;

    for token in tokens {
        let token = token.as_ref();
        // malformed markers abort the render even inside skipped blocks
        match parse_marker(token)? {
            None => {
                if skip_depth == 0 {
                    output.push(token.to_string());
                }
            }
            Some(Marker::If(expr)) => {
                if_depth += 1;
                if skip_depth > 0 {
                    skip_depth += 1;
                } else if !evaluate(expr, context)? {
                    skip_depth += 1;
                }
            }
            Some(Marker::End) => {
                if if_depth == 0 {
                    return Err(Error::template("{{end}} without matching {{if}}", token));
                }
                if_depth -= 1;
                skip_depth = skip_depth.saturating_sub(1);
            }
            Some(Marker::Variable(path)) => {
                if skip_depth == 0 {
                    output.push(resolve(path, context)?);
                }
            }
        }
    }

    if if_depth != 0 {
        return Err(Error::template(
            format!("{if_depth} {{{{if}}}} block(s) not closed by {{{{end}}}}"),
            tokens
                .last()
                .map(|t| t.as_ref().to_string())
                .unwrap_or_default(),
        ));
    }

    Ok(output)
}
