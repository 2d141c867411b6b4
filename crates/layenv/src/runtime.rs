// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Capabilities a build consumes from a container runtime.
//!
//! Backends implement [`Runtime`] for snapshot listing and [`Container`]
//! for the container a build runs in. The host process backend lives in
//! [`crate::host`].

use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;

/// A filesystem snapshot known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    /// Content identifier of the snapshot.
    pub name: String,
    /// Snapshot this one was created on top of, if any.
    pub parent: Option<String>,
}

impl Snapshot {
    pub fn new<N: Into<String>>(name: N, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }
}

/// Where a process's standard streams go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecStream {
    /// Share the caller's stdin, stdout and stderr.
    #[default]
    Inherit,
    /// Discard output and read nothing.
    Null,
}

/// Description of a process to start inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub cwd: PathBuf,
    pub uid: u32,
    pub gid: u32,
    pub args: Vec<String>,
    /// `NAME=value` assignments making up the whole environment.
    pub env: Vec<String>,
}

/// A process started with [`Container::exec`].
#[async_trait]
pub trait Process: Send + Sync {
    /// Wait for the process to exit and return its exit code.
    ///
    /// Processes killed by a signal report `128 + signal`.
    async fn wait(&self) -> Result<i32>;

    /// Deliver a signal to the running process.
    fn signal(&self, signal: i32) -> Result<()>;
}

/// A container a build executes in.
#[async_trait]
pub trait Container: Send + Sync {
    /// Select the root filesystem, `None` meaning the base image.
    async fn set_rootfs(&self, snapshot: Option<&Snapshot>) -> Result<()>;

    /// Start a process.
    async fn exec(&self, stream: ExecStream, spec: &ProcessSpec) -> Result<Box<dyn Process>>;

    /// Capture the current filesystem as a snapshot.
    ///
    /// Runtimes without snapshot support report
    /// [`crate::Error::NotImplemented`]; a runtime that already holds an
    /// identical snapshot may report [`crate::Error::AlreadyExists`].
    async fn snapshot(&self) -> Result<Option<Snapshot>>;

    /// Remove the container and its uncommitted state.
    async fn delete(&self) -> Result<()>;
}

/// Runtime level operations.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// All snapshots currently stored by the runtime.
    async fn snapshots(&self) -> Result<Vec<Snapshot>>;
}
