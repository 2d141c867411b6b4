// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Explicit value tree used as the variable context of command templates.
//!
//! Templates never look at native rust structures. Callers build a
//! [`Value`] once per build (usually a struct with `Environment`, `User`
//! and `Parameters` fields) and variable paths walk this tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./value_test.rs"]
mod value_test;

/// A node in the template context tree.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(try_from = "serde_yaml::Value", into = "serde_yaml::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint32(u32),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Create an empty struct value.
    pub fn new_struct() -> Self {
        Self::Struct(IndexMap::new())
    }

    /// Builder style helper that sets a field, turning `self` into a
    /// struct if it was not one already.
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a named field, turning `self` into a struct if needed.
    pub fn set_field<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        if !matches!(self, Self::Struct(_)) {
            *self = Self::new_struct();
        }
        if let Self::Struct(fields) = self {
            fields.insert(name.into(), value.into());
        }
    }

    /// Look up a named field of a struct value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Short name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Uint32(_) => "uint32",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Struct(_) => "struct",
        }
    }

    /// True for values that must be traversed further by a path.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Struct(_) | Self::List(_))
    }

    /// Render a scalar as template text.
    ///
    /// Booleans render as `"true"` or the empty string. Returns `None` for
    /// kinds that templates cannot print (null, float, list, struct).
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Bool(true) => Some("true".to_string()),
            Self::Bool(false) => Some(String::new()),
            Self::Int(i) => Some(i.to_string()),
            Self::Uint32(u) => Some(u.to_string()),
            Self::Null | Self::Float(_) | Self::List(_) | Self::Struct(_) => None,
        }
    }

    /// Parse a command line style parameter value.
    ///
    /// `true`/`false` become booleans, integers become integers and
    /// anything else is kept as text.
    pub fn parse_param(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Uint32(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<serde_yaml::Value> for Value {
    type Error = crate::Error;

    fn try_from(value: serde_yaml::Value) -> crate::Result<Self> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => Self::Null,
            Yaml::Bool(b) => Self::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Text(n.to_string())
                }
            }
            Yaml::String(s) => Self::Text(s),
            Yaml::Sequence(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<crate::Result<_>>()?,
            ),
            Yaml::Mapping(mapping) => {
                let mut fields = IndexMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = match key {
                        Yaml::String(s) => s,
                        Yaml::Bool(b) => b.to_string(),
                        Yaml::Number(n) => n.to_string(),
                        other => {
                            return Err(crate::Error::ValidationFailed(format!(
                                "unsupported mapping key in environment: {other:?}"
                            )));
                        }
                    };
                    fields.insert(key, Self::try_from(value)?);
                }
                Self::Struct(fields)
            }
            Yaml::Tagged(tagged) => Self::try_from(tagged.value)?,
        })
    }
}

impl From<Value> for serde_yaml::Value {
    fn from(value: Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Value::Null => Yaml::Null,
            Value::Bool(b) => Yaml::Bool(b),
            Value::Int(i) => Yaml::Number(i.into()),
            Value::Uint32(u) => Yaml::Number(u.into()),
            Value::Float(f) => Yaml::Number(f.into()),
            Value::Text(s) => Yaml::String(s),
            Value::List(items) => Yaml::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Struct(fields) => Yaml::Mapping(
                fields
                    .into_iter()
                    .map(|(k, v)| (Yaml::String(k), v.into()))
                    .collect(),
            ),
        }
    }
}
