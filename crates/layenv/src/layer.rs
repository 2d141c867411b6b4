// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Workspace, layer and command data types, and the `layenv.yaml` file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[cfg(test)]
#[path = "./layer_test.rs"]
mod layer_test;

/// API version for workspace files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "layenv/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// A single command line run while building a layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Command {
    /// Free-form label shown in progress output.
    pub name: String,

    /// Extra `NAME=value` environment assignments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<String>,

    /// Argument tokens, possibly containing template markers.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Command {
    pub fn new<N, I, S>(name: N, args: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            envs: Vec::new(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_env<K: AsRef<str>, V: AsRef<str>>(mut self, name: K, value: V) -> Self {
        self.envs
            .push(format!("{}={}", name.as_ref(), value.as_ref()));
        self
    }

    /// Split the env assignments into name/value pairs.
    pub fn env_pairs(&self) -> crate::Result<Vec<(&str, &str)>> {
        self.envs
            .iter()
            .map(|assignment| match assignment.split_once('=') {
                Some((name, value)) if !name.is_empty() => Ok((name, value)),
                _ => Err(crate::Error::Internal(format!(
                    "command {:?} has a malformed env assignment {assignment:?}",
                    self.name
                ))),
            })
            .collect()
    }
}

/// An ordered, named group of commands cached as one snapshot.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Layer {
    pub name: String,

    /// Snapshot produced when this layer was last built; empty when the
    /// layer was never built or has been invalidated.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,

    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Layer {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_digest<D: Into<String>>(mut self, digest: D) -> Self {
        self.digest = digest.into();
        self
    }

    /// True if a digest was recorded for this layer.
    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }
}

fn default_environment() -> Value {
    Value::new_struct()
}

/// A named environment definition: its variables and its layers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Workspace {
    /// API version identifier.
    pub api: ApiVersion,

    pub name: String,

    /// Variables available to templates as `.Environment`.
    #[serde(default = "default_environment")]
    pub environment: Value,

    /// Layers in build order.
    #[serde(default)]
    pub layers: Vec<Layer>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Workspace {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            api: ApiVersion::default(),
            name: name.into(),
            environment: default_environment(),
            layers: Vec::new(),
            source_path: None,
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Parse a workspace from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        let workspace: Self = match with_version.api {
            ApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                    error: e,
                    yaml_content: yaml,
                })?
            }
        };
        workspace.validate()?;
        Ok(workspace)
    }

    /// Load a workspace from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut workspace = Self::from_yaml(yaml)?;
        workspace.source_path = Some(path.to_path_buf());
        Ok(workspace)
    }

    /// Write the workspace, including current layer digests, to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|e| crate::Error::InvalidYaml {
            error: e,
            yaml_content: String::new(),
        })?;
        std::fs::write(path, yaml)?;
        tracing::debug!(path = %path.display(), "saved workspace");
        Ok(())
    }

    /// Check that layer names are present and unique.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.name.is_empty() {
                return Err(crate::Error::ValidationFailed(format!(
                    "layer {index} has no name"
                )));
            }
            if !seen.insert(layer.name.as_str()) {
                return Err(crate::Error::ValidationFailed(format!(
                    "duplicate layer name {:?}",
                    layer.name
                )));
            }
        }
        Ok(())
    }

    /// Position of the named layer.
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    /// Forget the digest of the layer at `index` and of every later layer.
    ///
    /// Later layers were built on top of the invalidated one, so none of
    /// their snapshots can be reused either.
    pub fn invalidate_from(&mut self, index: usize) {
        for layer in self.layers.iter_mut().skip(index) {
            if layer.has_digest() {
                tracing::debug!(layer = %layer.name, digest = %layer.digest, "invalidating layer");
            }
            layer.digest.clear();
        }
    }

    /// Recorded digests, in layer order.
    pub fn digests(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.digest.as_str()).collect()
    }
}
