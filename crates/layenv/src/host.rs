// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Runtime backend that runs build commands directly on the host.
//!
//! The host has no snapshot storage, so every build starts from the
//! current host filesystem and no layer digests are recorded.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::runtime::{Container, ExecStream, Process, ProcessSpec, Runtime, Snapshot};
use crate::{Error, Result};

#[cfg(all(test, unix))]
#[path = "./host_test.rs"]
mod host_test;

/// Host runtime: no snapshots are ever stored.
#[derive(Debug, Clone, Default)]
pub struct HostRuntime;

#[async_trait]
impl Runtime for HostRuntime {
    async fn snapshots(&self) -> Result<Vec<Snapshot>> {
        Ok(Vec::new())
    }
}

/// Host "container": commands run as child processes of this one.
#[derive(Debug, Clone, Default)]
pub struct HostContainer;

impl HostContainer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Container for HostContainer {
    async fn set_rootfs(&self, snapshot: Option<&Snapshot>) -> Result<()> {
        match snapshot {
            None => Ok(()),
            Some(snapshot) => Err(Error::NotImplemented(format!(
                "host runtime cannot start from snapshot {}",
                snapshot.name
            ))),
        }
    }

    async fn exec(&self, stream: ExecStream, spec: &ProcessSpec) -> Result<Box<dyn Process>> {
        let (program, args) = spec
            .args
            .split_first()
            .ok_or_else(|| Error::Internal("cannot execute an empty command".to_string()))?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).current_dir(&spec.cwd).env_clear();
        for assignment in &spec.env {
            let (name, value) = assignment.split_once('=').ok_or_else(|| {
                Error::Internal(format!("malformed env assignment {assignment:?}"))
            })?;
            cmd.env(name, value);
        }
        if stream == ExecStream::Null {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        #[cfg(unix)]
        if nix::unistd::geteuid().is_root() {
            cmd.uid(spec.uid).gid(spec.gid);
        } else {
            tracing::debug!(
                uid = spec.uid,
                gid = spec.gid,
                "not running as root, commands keep the current user"
            );
        }

        let child = cmd
            .spawn()
            .map_err(|e| Error::Runtime(format!("failed to start {program:?}: {e}")))?;
        let pid = child.id();
        Ok(Box::new(HostProcess {
            child: Mutex::new(child),
            pid,
        }))
    }

    async fn snapshot(&self) -> Result<Option<Snapshot>> {
        Err(Error::NotImplemented(
            "host runtime does not store snapshots".to_string(),
        ))
    }

    async fn delete(&self) -> Result<()> {
        Ok(())
    }
}

struct HostProcess {
    child: Mutex<Child>,
    pid: Option<u32>,
}

#[async_trait]
impl Process for HostProcess {
    async fn wait(&self) -> Result<i32> {
        let status = self.child.lock().await.wait().await?;
        if let Some(code) = status.code() {
            return Ok(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Ok(128 + signal);
            }
        }
        Err(Error::Runtime(format!("process ended without exit code: {status}")))
    }

    #[cfg(unix)]
    fn signal(&self, signal: i32) -> Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            // already reaped
            return Ok(());
        };
        let signal = Signal::try_from(signal)
            .map_err(|e| Error::Runtime(format!("invalid signal {signal}: {e}")))?;
        kill(Pid::from_raw(pid as i32), signal)
            .map_err(|e| Error::Runtime(format!("failed to signal process {pid}: {e}")))
    }

    #[cfg(not(unix))]
    fn signal(&self, signal: i32) -> Result<()> {
        Err(Error::NotImplemented(format!(
            "cannot forward signal {signal} on this platform"
        )))
    }
}
