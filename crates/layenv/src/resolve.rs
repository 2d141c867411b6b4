// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Dotted variable paths such as `.Environment.Packages[1]`.

use crate::value::Value;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// One `Name` or `Name[index]` step of a variable path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment<'a> {
    name: &'a str,
    index: Option<usize>,
}

fn parse_segment<'a>(path: &str, raw: &'a str) -> Result<Segment<'a>> {
    let Some(open) = raw.find('[') else {
        if raw.contains(']') {
            return Err(Error::variable(path, format!("unbalanced ']' in {raw:?}")));
        }
        return Ok(Segment {
            name: raw,
            index: None,
        });
    };

    let name = &raw[..open];
    let index = raw[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| Error::variable(path, format!("unterminated index in {raw:?}")))?;
    let index = index
        .parse::<usize>()
        .map_err(|_| Error::variable(path, format!("invalid list index {index:?}")))?;
    if name.is_empty() {
        return Err(Error::variable(path, "index without a field name"));
    }
    Ok(Segment {
        name,
        index: Some(index),
    })
}

/// Walk `path` through `context` and return the value it names.
///
/// Every segment must name a field of a struct value; a bracketed index
/// selects an element of a list field.
pub fn lookup<'a>(path: &str, context: &'a Value) -> Result<&'a Value> {
    let rest = path
        .strip_prefix('.')
        .ok_or_else(|| Error::variable(path, "variable paths must start with '.'"))?;
    if rest.is_empty() {
        return Err(Error::variable(path, "path is too short to reach a value"));
    }

    let mut current = context;
    let mut walked = String::new();
    for raw in rest.split('.') {
        if raw.is_empty() {
            return Err(Error::variable(path, "empty field name"));
        }
        let segment = parse_segment(path, raw)?;

        let Value::Struct(fields) = current else {
            let at = if walked.is_empty() { "." } else { walked.as_str() };
            return Err(Error::variable(
                path,
                format!("{at} is a {} and has no fields", current.kind()),
            ));
        };
        walked.push('.');
        walked.push_str(segment.name);

        current = fields
            .get(segment.name)
            .ok_or_else(|| Error::variable(path, format!("no field named {:?}", segment.name)))?;

        if let Some(index) = segment.index {
            let Value::List(items) = current else {
                return Err(Error::variable(
                    path,
                    format!("{walked} is a {} and cannot be indexed", current.kind()),
                ));
            };
            current = items.get(index).ok_or_else(|| {
                Error::variable(
                    path,
                    format!("index {index} is out of bounds for {walked} (length {})", items.len()),
                )
            })?;
            walked.push_str(&format!("[{index}]"));
        }
    }
    Ok(current)
}

/// Resolve `path` against `context` into its scalar text.
///
/// Booleans resolve to `"true"` or the empty string, integers to their
/// decimal form. Paths ending on a struct or list are too short, and
/// other kinds cannot be rendered.
pub fn resolve(path: &str, context: &Value) -> Result<String> {
    let value = lookup(path, context)?;
    if value.is_structured() {
        return Err(Error::variable(
            path,
            format!("path is too short to reach a scalar, found a {}", value.kind()),
        ));
    }
    value.as_scalar().ok_or_else(|| {
        Error::variable(path, format!("unsupported value kind {}", value.kind()))
    })
}
