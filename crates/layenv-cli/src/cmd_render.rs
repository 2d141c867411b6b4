// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Show the rendered command lines without running them
#[derive(Debug, Args)]
pub struct CmdRender {
    #[clap(flatten)]
    pub workspace: crate::WorkspaceFlags,

    #[clap(flatten)]
    pub params: crate::ParamFlags,

    /// Only render the named layer
    #[clap(long)]
    pub layer: Option<String>,
}

impl CmdRender {
    pub async fn run(&mut self) -> Result<i32> {
        let workspace = self.workspace.load()?;
        let user = layenv::User::current()?;
        let parameters = self.params.to_value()?;
        let context = layenv::template_context(&workspace, &user, &parameters);

        let layers = match &self.layer {
            None => workspace.layers.as_slice(),
            Some(name) => {
                let index = workspace.layer_index(name).ok_or_else(|| {
                    miette::miette!("No layer named {name:?} in {:?}", self.workspace.file)
                })?;
                &workspace.layers[index..=index]
            }
        };
        for layer in layers {
            println!("{}", layer.name.bold());
            for command in &layer.commands {
                let args = layenv::render(&command.args, &context)?;
                if args.is_empty() {
                    println!("  {}: {}", command.name, "(skipped)".dimmed());
                } else {
                    println!("  {}: {}", command.name, args.join(" "));
                }
            }
        }
        Ok(0)
    }
}
