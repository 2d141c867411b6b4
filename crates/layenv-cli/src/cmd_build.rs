// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `layenv build` command.

use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use layenv::build::DEFAULT_BUILD_PATH;
use layenv::{ProgressReceiver, Status};
use miette::Result;

#[cfg(test)]
#[path = "./cmd_build_test.rs"]
mod cmd_build_test;

/// Build the workspace layers
#[derive(Debug, Args)]
pub struct CmdBuild {
    #[clap(flatten)]
    pub workspace: crate::WorkspaceFlags,

    #[clap(flatten)]
    pub params: crate::ParamFlags,

    /// Build only the first N layers
    #[clap(long, conflicts_with = "layer")]
    pub target: Option<usize>,

    /// Build up to and including the named layer
    #[clap(long)]
    pub layer: Option<String>,

    /// User id that build commands run as
    #[clap(long, env = "LAYENV_BUILD_UID", default_value_t = 0)]
    pub build_uid: u32,

    /// Group id that build commands run as
    #[clap(long, env = "LAYENV_BUILD_GID", default_value_t = 0)]
    pub build_gid: u32,

    /// PATH given to build commands
    #[clap(long = "path", env = "LAYENV_PATH", default_value = DEFAULT_BUILD_PATH)]
    pub base_path: String,

    /// Working directory of build commands
    #[clap(long, env = "LAYENV_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Discard the output of build commands
    #[clap(long)]
    pub silent: bool,

    /// Do not write new layer digests back to the workspace file
    #[clap(long)]
    pub no_save: bool,
}

impl CmdBuild {
    pub async fn run(&mut self) -> Result<i32> {
        let mut workspace = self.workspace.load()?;

        let target = match (&self.layer, self.target) {
            (Some(name), _) => {
                let index = workspace.layer_index(name).ok_or_else(|| {
                    miette::miette!("No layer named {name:?} in {:?}", self.workspace.file)
                })?;
                Some(index + 1)
            }
            (None, target) => target,
        };

        let config = layenv::BuildConfig {
            build_uid: self.build_uid,
            build_gid: self.build_gid,
            base_path: self.base_path.clone(),
            workdir: self.workdir.clone(),
            stream: if self.silent {
                layenv::ExecStream::Null
            } else {
                layenv::ExecStream::Inherit
            },
            forward_signals: true,
        };
        let request = layenv::BuildRequest {
            user: layenv::User::current()?,
            parameters: self.params.to_value()?,
            target,
        };

        let recorded: Vec<String> = workspace.digests().into_iter().map(String::from).collect();
        let (sender, receiver) = layenv::progress_channel();
        let printer = tokio::spawn(print_progress(receiver));

        let runtime = layenv::HostRuntime;
        let container = layenv::HostContainer::new();
        tracing::info!("Building {}...", workspace.name);
        let result = layenv::LayerBuilder::new(&config, &runtime, &container)
            .with_progress(sender)
            .build(&mut workspace, &request)
            .await;

        printer
            .await
            .map_err(|e| miette::miette!("Progress printer failed: {e}"))?;

        // digests of layers completed before a failure are still worth keeping
        if !self.no_save {
            save_digests(&workspace, &recorded, &self.workspace.file)?;
        }

        let summary = result?;
        println!(
            "{} {} command(s) run, {} skipped, {} layer(s) committed, {} reused",
            "Built".green().bold(),
            summary.executed,
            summary.skipped,
            summary.committed,
            summary.resume_index,
        );
        Ok(0)
    }
}

/// Write `workspace` back to `path` if its digests differ from
/// `recorded`, returning whether the file was written.
///
/// Saving rewrites the whole file, so it is skipped when nothing changed.
fn save_digests(
    workspace: &layenv::Workspace,
    recorded: &[String],
    path: &Path,
) -> layenv::Result<bool> {
    if workspace.digests() == recorded {
        tracing::debug!(path = %path.display(), "layer digests unchanged, not saving");
        return Ok(false);
    }
    workspace.save(path)?;
    Ok(true)
}

/// Print progress updates until the build closes the channel.
async fn print_progress(mut receiver: ProgressReceiver) {
    while let Some(update) = receiver.recv().await {
        for progress in update {
            let status = match progress.status {
                Status::Pending => "pending".dimmed(),
                Status::Running => "running".yellow(),
                Status::Exists => "cached".blue(),
                Status::Complete => "done".green(),
            };
            if progress.detail.is_empty() {
                eprintln!(
                    "[{status:>8}] {} ({}/{})",
                    progress.reference.bold(),
                    progress.offset,
                    progress.total
                );
            } else {
                eprintln!(
                    "[{status:>8}] {} ({}/{}) {}",
                    progress.reference.bold(),
                    progress.offset + 1,
                    progress.total,
                    progress.detail
                );
            }
        }
    }
}
