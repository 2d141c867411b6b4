// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! layenv - Layered Development Environment Builder CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_build;
mod cmd_eval;
mod cmd_render;
mod cmd_status;

use cmd_build::CmdBuild;
use cmd_eval::CmdEval;
use cmd_render::CmdRender;
use cmd_status::CmdStatus;

#[derive(Parser)]
#[clap(
    name = "layenv",
    about = "Layered Development Environment Builder",
    version,
    long_about = "Build development environments from cached layers of templated commands"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct WorkspaceFlags {
    /// Workspace file to use
    #[clap(short = 'f', long = "file", env = "LAYENV_FILE", default_value = layenv::LAYENV_FILENAME)]
    pub file: PathBuf,
}

impl WorkspaceFlags {
    pub fn load(&self) -> Result<layenv::Workspace> {
        Ok(layenv::Workspace::load(&self.file)?)
    }
}

#[derive(Parser, Clone, Debug, Default)]
pub struct ParamFlags {
    /// Build parameter available to templates as .Parameters.NAME
    #[clap(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
}

impl ParamFlags {
    /// Collect the parameters into a struct value.
    pub fn to_value(&self) -> Result<layenv::Value> {
        let mut value = layenv::Value::new_struct();
        for param in &self.params {
            let (name, raw) = param
                .split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| {
                    miette::miette!("Invalid parameter {param:?}, expected NAME=VALUE")
                })?;
            value.set_field(name, layenv::Value::parse_param(raw));
        }
        Ok(value)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build the workspace layers
    Build(CmdBuild),

    /// Show the rendered command lines without running them
    Render(CmdRender),

    /// Evaluate a template condition
    Eval(CmdEval),

    /// List layers and their recorded digests
    Status(CmdStatus),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Build(mut cmd) => cmd.run().await,
            Command::Render(mut cmd) => cmd.run().await,
            Command::Eval(mut cmd) => cmd.run().await,
            Command::Status(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_param_flags_to_value() {
        let flags = ParamFlags {
            params: vec![
                "Upgrade=true".to_string(),
                "Jobs=4".to_string(),
                "Release=bookworm".to_string(),
                "Empty=".to_string(),
            ],
        };
        let value = flags.to_value().unwrap();
        assert_eq!(value.field("Upgrade"), Some(&layenv::Value::Bool(true)));
        assert_eq!(value.field("Jobs"), Some(&layenv::Value::Int(4)));
        assert_eq!(value.field("Release"), Some(&layenv::Value::from("bookworm")));
        assert_eq!(value.field("Empty"), Some(&layenv::Value::from("")));
    }

    #[rstest]
    #[case("NoValue")]
    #[case("=value")]
    fn test_param_flags_invalid(#[case] param: &str) {
        let flags = ParamFlags {
            params: vec![param.to_string()],
        };
        assert!(flags.to_value().is_err());
    }

    #[rstest]
    fn test_parse_build_command() {
        let opt = Opt::try_parse_from([
            "layenv", "-v", "build", "-f", "env.yaml", "--target", "2", "-p", "Upgrade=true",
        ])
        .unwrap();
        assert_eq!(opt.logging.verbose, 1);
        match opt.cmd {
            Command::Build(cmd) => {
                assert_eq!(cmd.workspace.file, PathBuf::from("env.yaml"));
                assert_eq!(cmd.target, Some(2));
                assert_eq!(cmd.params.params, vec!["Upgrade=true"]);
            }
            _ => panic!("expected build command"),
        }
    }

    #[rstest]
    fn test_workspace_flags_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(layenv::LAYENV_FILENAME);
        std::fs::write(
            &file,
            "api: layenv/v0\nname: dev\nlayers:\n  - name: base\n    commands:\n      - name: hello\n        args: [echo, hello]\n",
        )
        .unwrap();

        let flags = WorkspaceFlags { file: file.clone() };
        let workspace = flags.load().unwrap();
        assert_eq!(workspace.name, "dev");
        assert_eq!(workspace.layer_index("base"), Some(0));

        let missing = WorkspaceFlags {
            file: dir.path().join("missing.yaml"),
        };
        assert!(missing.load().is_err());
    }

    #[rstest]
    fn test_target_conflicts_with_layer() {
        let result = Opt::try_parse_from(["layenv", "build", "--target", "1", "--layer", "base"]);
        assert!(result.is_err());
    }
}
