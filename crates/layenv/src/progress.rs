// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Per-layer build progress records and the channel carrying them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Build state of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// Waiting to be built.
    Pending,
    /// Commands are being executed.
    Running,
    /// Satisfied by an existing snapshot.
    Exists,
    /// Built during this run.
    Complete,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Exists => "exists",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Progress of a single layer at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStatus {
    /// Name of the layer.
    pub reference: String,
    pub status: Status,
    /// Name of the running command, if any.
    pub detail: String,
    /// Commands executed so far.
    pub offset: usize,
    /// Commands in the layer.
    pub total: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressStatus {
    pub fn new<R: Into<String>>(reference: R, status: Status, total: usize) -> Self {
        Self {
            reference: reference.into(),
            status,
            detail: String::new(),
            offset: 0,
            total,
            started_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// Receiving end of a build's progress updates.
pub type ProgressReceiver = mpsc::Receiver<Vec<ProgressStatus>>;

/// Sending end of a build's progress updates.
///
/// The build owns the sender and drops it when it returns, which closes
/// the channel.
pub type ProgressSender = mpsc::Sender<Vec<ProgressStatus>>;

/// Create a progress channel.
///
/// Capacity is one, so the build waits for the consumer before getting
/// more than one update ahead.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(1)
}
