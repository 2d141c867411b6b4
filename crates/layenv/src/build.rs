// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Incremental layer builds.
//!
//! A build walks the workspace layers up to a target index. Layers whose
//! recorded digest still names a stored snapshot are reused: the last of
//! them becomes the container's root filesystem and building resumes
//! right after it. Each remaining layer has its commands rendered and
//! executed in order, then is committed as a new snapshot whose name is
//! recorded as the layer digest.

use std::path::PathBuf;

use chrono::Utc;

use crate::layer::{Layer, Workspace};
use crate::progress::{ProgressSender, ProgressStatus, Status};
use crate::runtime::{Container, ExecStream, ProcessSpec, Runtime, Snapshot};
use crate::signals::ForwardedSignals;
use crate::template::render;
use crate::value::Value;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./build_test.rs"]
mod build_test;

/// `PATH` given to every build command.
pub const DEFAULT_BUILD_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Settings shared by every command of a build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// User id build commands run as.
    pub build_uid: u32,
    /// Group id build commands run as.
    pub build_gid: u32,
    /// `PATH` of build commands, before command specific envs.
    pub base_path: String,
    /// Working directory of build commands.
    pub workdir: PathBuf,
    pub stream: ExecStream,
    /// Forward SIGINT, SIGTERM, SIGHUP and SIGQUIT to the running command.
    ///
    /// Listening installs process wide handlers that stay in place after
    /// the build: these signals no longer terminate the calling process.
    /// Callers that rely on the default Ctrl-C behaviour must turn this
    /// off. Signals received between commands are dropped.
    pub forward_signals: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_uid: 0,
            build_gid: 0,
            base_path: DEFAULT_BUILD_PATH.to_string(),
            workdir: PathBuf::from("/"),
            stream: ExecStream::Inherit,
            forward_signals: true,
        }
    }
}

/// The user an environment is being built for, exposed to templates as
/// `.User`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
}

impl User {
    /// The user running this process.
    #[cfg(unix)]
    pub fn current() -> Result<Self> {
        let uid = nix::unistd::getuid();
        let user = nix::unistd::User::from_uid(uid)
            .map_err(|e| Error::Runtime(format!("failed to look up user {uid}: {e}")))?
            .ok_or_else(|| Error::Runtime(format!("no passwd entry for user {uid}")))?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir.display().to_string(),
            shell: user.shell.display().to_string(),
        })
    }

    #[cfg(not(unix))]
    pub fn current() -> Result<Self> {
        Ok(Self {
            name: std::env::var("USERNAME").unwrap_or_default(),
            home: std::env::var("USERPROFILE").unwrap_or_default(),
            ..Default::default()
        })
    }
}

impl From<&User> for Value {
    fn from(user: &User) -> Self {
        Value::new_struct()
            .with_field("Name", user.name.as_str())
            .with_field("Uid", user.uid)
            .with_field("Gid", user.gid)
            .with_field("Home", user.home.as_str())
            .with_field("Shell", user.shell.as_str())
    }
}

/// What to build and for whom.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub user: User,
    /// Exposed to templates as `.Parameters`.
    pub parameters: Value,
    /// Number of layers to build; `None` builds all of them.
    pub target: Option<usize>,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            user: User::default(),
            parameters: Value::new_struct(),
            target: None,
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// First layer that was not satisfied by an existing snapshot.
    pub resume_index: usize,
    /// Number of layers the build covered.
    pub target: usize,
    /// Commands that were executed.
    pub executed: usize,
    /// Commands that rendered to nothing and were skipped.
    pub skipped: usize,
    /// Layers that got a new digest.
    pub committed: usize,
}

/// Build the variable context templates are rendered against.
pub fn template_context(workspace: &Workspace, user: &User, parameters: &Value) -> Value {
    Value::new_struct()
        .with_field("Environment", workspace.environment.clone())
        .with_field("User", Value::from(user))
        .with_field("Parameters", parameters.clone())
}

/// Find where a build of the first `target` layers can resume.
///
/// Returns the index of the first layer to build and the snapshot to
/// start from. The last layer whose digest names an existing snapshot
/// wins; without any, the build starts at 0 from the base image.
pub fn find_resume_point(
    layers: &[Layer],
    target: usize,
    snapshots: &[Snapshot],
) -> (usize, Option<Snapshot>) {
    let mut resume = (0, None);
    for (index, layer) in layers.iter().take(target).enumerate() {
        if !layer.has_digest() {
            continue;
        }
        match snapshots.iter().find(|s| s.name == layer.digest) {
            Some(snapshot) => resume = (index + 1, Some(snapshot.clone())),
            None => tracing::debug!(
                layer = %layer.name,
                digest = %layer.digest,
                "recorded snapshot no longer exists"
            ),
        }
    }
    resume
}

/// Drives one build inside a container.
pub struct LayerBuilder<'a> {
    config: &'a BuildConfig,
    runtime: &'a dyn Runtime,
    container: &'a dyn Container,
    progress: Option<ProgressSender>,
}

impl<'a> LayerBuilder<'a> {
    pub fn new(
        config: &'a BuildConfig,
        runtime: &'a dyn Runtime,
        container: &'a dyn Container,
    ) -> Self {
        Self {
            config,
            runtime,
            container,
            progress: None,
        }
    }

    /// Report progress on `sender`; it is dropped, closing the channel,
    /// when the build returns.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Build `workspace` up to the requested target, updating layer
    /// digests in place.
    ///
    /// Any failure after the container has been prepared deletes the
    /// container and returns the original error; the failing layer is left
    /// without a digest.
    pub async fn build(self, workspace: &mut Workspace, request: &BuildRequest) -> Result<BuildSummary> {
        let count = workspace.layers.len();
        let target = match request.target {
            None => count,
            Some(target) if target <= count => target,
            Some(target) => return Err(Error::InvalidTarget { target, count }),
        };

        match self.run(workspace, request, target).await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                tracing::debug!("build failed, deleting container: {err}");
                if let Err(delete_err) = self.container.delete().await {
                    tracing::warn!("failed to delete container after build failure: {delete_err}");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        workspace: &mut Workspace,
        request: &BuildRequest,
        target: usize,
    ) -> Result<BuildSummary> {
        let snapshots = self.runtime.snapshots().await?;
        let (resume_index, root) = find_resume_point(&workspace.layers, target, &snapshots);
        match &root {
            Some(snapshot) => tracing::info!(
                resume_index,
                target,
                root = %snapshot.name,
                "resuming build from cached snapshot"
            ),
            None => tracing::info!(target, "building from base image"),
        }
        self.container.set_rootfs(root.as_ref()).await?;

        let mut summary = BuildSummary {
            resume_index,
            target,
            ..Default::default()
        };

        let initial = workspace
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                let status = if index < resume_index {
                    Status::Exists
                } else {
                    Status::Pending
                };
                ProgressStatus::new(layer.name.as_str(), status, layer.commands.len())
            })
            .collect();
        self.emit(initial).await;

        let mut signals = if self.config.forward_signals {
            ForwardedSignals::listen()?
        } else {
            ForwardedSignals::none()
        };

        let context = template_context(workspace, &request.user, &request.parameters);
        for layer in workspace.layers[resume_index..target].iter_mut() {
            self.build_layer(layer, &context, &mut signals, &mut summary)
                .await?;
        }
        Ok(summary)
    }

    async fn build_layer(
        &self,
        layer: &mut Layer,
        context: &Value,
        signals: &mut ForwardedSignals,
        summary: &mut BuildSummary,
    ) -> Result<()> {
        layer.digest.clear();
        let started = Utc::now();
        let total = layer.commands.len();

        for (offset, command) in layer.commands.iter().enumerate() {
            self.emit(vec![ProgressStatus {
                reference: layer.name.clone(),
                status: Status::Running,
                detail: command.name.clone(),
                offset,
                total,
                started_at: Some(started),
                updated_at: Utc::now(),
            }])
            .await;

            let args = render(&command.args, context)?;
            if args.is_empty() {
                tracing::debug!(layer = %layer.name, command = %command.name, "nothing to run, skipping");
                summary.skipped += 1;
                continue;
            }

            let mut env = vec![format!("PATH={}", self.config.base_path)];
            for (name, value) in command.env_pairs()? {
                env.push(format!("{name}={value}"));
            }
            let spec = ProcessSpec {
                cwd: self.config.workdir.clone(),
                uid: self.config.build_uid,
                gid: self.config.build_gid,
                args,
                env,
            };
            let command_line = spec.args.join(" ");
            tracing::debug!(layer = %layer.name, command = %command.name, "running: {command_line}");

            let code = self.execute(&spec, signals).await?;
            if code != 0 {
                return Err(Error::CommandFailed {
                    command: command_line,
                    code,
                });
            }
            summary.executed += 1;
        }

        match self.container.snapshot().await {
            Ok(Some(snapshot)) => {
                tracing::info!(layer = %layer.name, digest = %snapshot.name, "layer committed");
                layer.digest = snapshot.name;
                summary.committed += 1;
            }
            Ok(None) => {
                tracing::info!(layer = %layer.name, "runtime produced no snapshot for layer");
            }
            Err(err) if err.is_snapshot_unsupported() => {
                tracing::info!(layer = %layer.name, "layer not snapshotted: {err}");
            }
            Err(err) => return Err(err),
        }

        self.emit(vec![ProgressStatus {
            reference: layer.name.clone(),
            status: Status::Complete,
            detail: String::new(),
            offset: total,
            total,
            started_at: Some(started),
            updated_at: Utc::now(),
        }])
        .await;
        Ok(())
    }

    /// Run one process to completion, forwarding signals while it runs.
    async fn execute(&self, spec: &ProcessSpec, signals: &mut ForwardedSignals) -> Result<i32> {
        for signal in signals.drain() {
            tracing::debug!(signal, "dropping signal received between commands");
        }
        let process = self.container.exec(self.config.stream, spec).await?;
        let wait = process.wait();
        tokio::pin!(wait);
        loop {
            tokio::select! {
                code = &mut wait => return code,
                signal = signals.recv() => {
                    tracing::debug!(signal, "forwarding signal to build command");
                    if let Err(err) = process.signal(signal) {
                        tracing::warn!("failed to forward signal {signal}: {err}");
                    }
                }
            }
        }
    }

    async fn emit(&self, statuses: Vec<ProgressStatus>) {
        if let Some(sender) = &self.progress {
            if sender.send(statuses).await.is_err() {
                tracing::debug!("progress receiver is gone, update dropped");
            }
        }
    }
}
