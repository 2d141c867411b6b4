// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for layenv operations.

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with layenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during layenv operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Malformed conditional expression
    #[error("Invalid expression: {message}")]
    #[diagnostic(
        code(layenv::invalid_expression),
        help("Expressions support literals, .Variables, ==, !=, &&, ||, !, (..) and `x in [a, b]`")
    )]
    InvalidExpression {
        message: String,
        #[source_code]
        expr: String,
        #[label("here")]
        span: SourceSpan,
    },

    /// Malformed command template token
    #[error("Invalid template token {token:?}: {message}")]
    #[diagnostic(
        code(layenv::invalid_template),
        help("Recognized markers are {{{{if <expr>}}}}, {{{{end}}}} and {{{{.Path}}}}")
    )]
    InvalidTemplate { message: String, token: String },

    /// Variable path could not be resolved against the build context
    #[error("Cannot resolve variable {path:?}: {reason}")]
    #[diagnostic(code(layenv::invalid_variable))]
    InvalidVariable { path: String, reason: String },

    /// Build target outside of the workspace layers
    #[error("Build target {target} is out of range for {count} layer(s)")]
    #[diagnostic(code(layenv::invalid_target))]
    InvalidTarget { target: usize, count: usize },

    /// A command exited with a non-zero status
    #[error("Command {command:?} failed with exit code {code}")]
    #[diagnostic(code(layenv::command_failed))]
    CommandFailed { command: String, code: i32 },

    /// A collaborator handed over a malformed command structure
    #[error("Internal error: {0}")]
    #[diagnostic(code(layenv::internal))]
    Internal(String),

    /// The runtime does not support the requested capability
    #[error("Not implemented by runtime: {0}")]
    #[diagnostic(code(layenv::not_implemented))]
    NotImplemented(String),

    /// The runtime refused to create something that already exists
    #[error("Already exists: {0}")]
    #[diagnostic(code(layenv::already_exists))]
    AlreadyExists(String),

    /// Any other runtime backend failure
    #[error("Runtime error: {0}")]
    #[diagnostic(code(layenv::runtime))]
    Runtime(String),

    /// Invalid YAML in workspace file
    #[error("Invalid workspace file: {error}")]
    #[diagnostic(
        code(layenv::invalid_yaml),
        help("Check YAML syntax and ensure 'api: layenv/v0' is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(layenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(layenv::validation_failed))]
    ValidationFailed(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(layenv::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an expression error pointing at `pos` within `expr`.
    pub(crate) fn expression<M: Into<String>>(message: M, expr: &str, pos: usize) -> Self {
        let len = expr[pos.min(expr.len())..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
        Self::InvalidExpression {
            message: message.into(),
            expr: expr.to_string(),
            span: (pos, len).into(),
        }
    }

    pub(crate) fn template<M: Into<String>, T: Into<String>>(message: M, token: T) -> Self {
        Self::InvalidTemplate {
            message: message.into(),
            token: token.into(),
        }
    }

    pub(crate) fn variable<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::InvalidVariable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for local, non-retryable input errors (bad template,
    /// expression, variable path or build target).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidExpression { .. }
                | Self::InvalidTemplate { .. }
                | Self::InvalidVariable { .. }
                | Self::InvalidTarget { .. }
        )
    }

    /// True for snapshot outcomes that a build tolerates because some
    /// runtimes cannot snapshot every layer.
    pub fn is_snapshot_unsupported(&self) -> bool {
        matches!(self, Self::NotImplemented(_) | Self::AlreadyExists(_))
    }

    /// The byte offset an expression error points at.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::InvalidExpression { span, .. } => Some(span.offset()),
            _ => None,
        }
    }
}
