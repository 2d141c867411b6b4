// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Forwarding of termination signals to the running build command.

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

#[cfg(all(test, unix))]
#[path = "./signals_test.rs"]
mod signals_test;

/// Signals received by this process that should reach the child.
pub struct ForwardedSignals {
    #[cfg(unix)]
    streams: Vec<(i32, Signal)>,
}

impl ForwardedSignals {
    /// Listen for SIGINT, SIGTERM, SIGHUP and SIGQUIT.
    #[cfg(unix)]
    pub fn listen() -> crate::Result<Self> {
        use nix::sys::signal::Signal as Sig;

        let mut streams = Vec::new();
        for sig in [Sig::SIGINT, Sig::SIGTERM, Sig::SIGHUP, Sig::SIGQUIT] {
            let number = sig as i32;
            streams.push((number, signal(SignalKind::from_raw(number))?));
        }
        Ok(Self { streams })
    }

    #[cfg(not(unix))]
    pub fn listen() -> crate::Result<Self> {
        Ok(Self {})
    }

    /// A listener that never yields a signal.
    pub fn none() -> Self {
        Self {
            #[cfg(unix)]
            streams: Vec::new(),
        }
    }

    /// Discard signals that arrived while no command was running and
    /// return their numbers.
    pub fn drain(&mut self) -> Vec<i32> {
        #[allow(unused_mut)]
        let mut drained = Vec::new();
        #[cfg(unix)]
        {
            let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
            for (number, stream) in self.streams.iter_mut() {
                while let std::task::Poll::Ready(Some(())) = stream.poll_recv(&mut cx) {
                    drained.push(*number);
                }
            }
        }
        drained
    }

    /// Wait for the next signal.
    ///
    /// Never completes when nothing is being listened for.
    pub async fn recv(&mut self) -> i32 {
        #[cfg(unix)]
        {
            if !self.streams.is_empty() {
                let polled = std::future::poll_fn(|cx| {
                    for (number, stream) in self.streams.iter_mut() {
                        if let std::task::Poll::Ready(Some(())) = stream.poll_recv(cx) {
                            return std::task::Poll::Ready(*number);
                        }
                    }
                    std::task::Poll::Pending
                });
                return polled.await;
            }
        }
        std::future::pending().await
    }
}
