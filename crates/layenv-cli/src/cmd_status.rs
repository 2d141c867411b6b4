// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use colored::Colorize;
use miette::Result;

/// List layers and their recorded digests
#[derive(Debug, Args)]
pub struct CmdStatus {
    #[clap(flatten)]
    pub workspace: crate::WorkspaceFlags,
}

impl CmdStatus {
    pub async fn run(&mut self) -> Result<i32> {
        let workspace = self.workspace.load()?;
        println!("{} ({})", workspace.name.bold(), self.workspace.file.display());
        for (index, layer) in workspace.layers.iter().enumerate() {
            let digest = if layer.has_digest() {
                layer.digest.green()
            } else {
                "not built".yellow()
            };
            println!(
                "{:>3}. {} [{} command(s)] {}",
                index + 1,
                layer.name.cyan(),
                layer.commands.len(),
                digest
            );
        }
        Ok(0)
    }
}
