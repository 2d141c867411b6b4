// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use miette::Result;

/// Evaluate a template condition
///
/// Exits with 0 when the condition holds and 1 when it does not.
#[derive(Debug, Args)]
pub struct CmdEval {
    #[clap(flatten)]
    pub workspace: crate::WorkspaceFlags,

    #[clap(flatten)]
    pub params: crate::ParamFlags,

    /// Condition to evaluate, eg: '.Environment.Update && .User.Uid != 0'
    #[clap(name = "EXPR")]
    pub expression: String,
}

impl CmdEval {
    pub async fn run(&mut self) -> Result<i32> {
        // conditions over .User and .Parameters work without a workspace file
        let workspace = if self.workspace.file.exists() {
            self.workspace.load()?
        } else {
            tracing::debug!(file = ?self.workspace.file, "no workspace file, using an empty environment");
            layenv::Workspace::new("eval")
        };
        let user = layenv::User::current()?;
        let parameters = self.params.to_value()?;
        let context = layenv::template_context(&workspace, &user, &parameters);

        let result = layenv::evaluate(&self.expression, &context)?;
        println!("{result}");
        Ok(if result { 0 } else { 1 })
    }
}
