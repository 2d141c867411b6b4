// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! layenv - Layered Development Environment Builder
//!
//! This crate provides the core library for building development
//! environments from an ordered list of layers, each a list of shell
//! commands, described in a workspace file (`layenv.yaml`).
//!
//! # Overview
//!
//! Every successfully built layer is committed as a runtime snapshot and
//! its name recorded as the layer digest. Later builds resume right after
//! the last layer whose snapshot still exists. Command arguments are
//! templates, so a single workspace can adapt to the user and to build
//! parameters.
//!
//! # Example
//!
//! ```yaml
//! # layenv.yaml
//! api: layenv/v0
//! name: dev
//!
//! # Variables available to templates as .Environment
//! environment:
//!   Update: true
//!
//! layers:
//!   - name: base
//!     commands:
//!       - name: upgrade
//!         envs: ["DEBIAN_FRONTEND=noninteractive"]
//!         args: ["{{if .Environment.Update}}", "apt-get", "upgrade", "-y", "{{end}}"]
//!   - name: user
//!     commands:
//!       - name: useradd
//!         args: ["useradd", "-m", "-u", "{{.User.Uid}}", "{{.User.Name}}"]
//! ```

pub mod build;
pub mod cond;
pub mod error;
pub mod host;
pub mod layer;
pub mod progress;
pub mod resolve;
pub mod runtime;
pub mod signals;
pub mod template;
pub mod value;

pub use build::{
    BuildConfig, BuildRequest, BuildSummary, LayerBuilder, User, find_resume_point,
    template_context,
};
pub use cond::evaluate;
pub use error::{Error, Result};
pub use host::{HostContainer, HostRuntime};
pub use layer::{ApiVersion, Command, Layer, Workspace};
pub use progress::{ProgressReceiver, ProgressSender, ProgressStatus, Status, progress_channel};
pub use resolve::resolve;
pub use runtime::{Container, ExecStream, Process, ProcessSpec, Runtime, Snapshot};
pub use template::render;
pub use value::Value;

/// Well-known filename for workspace files.
pub const LAYENV_FILENAME: &str = "layenv.yaml";
