// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use nix::sys::signal::{Signal as Sig, raise};
use rstest::rstest;

use super::*;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn test_drain_drops_pending_signals() {
    let mut signals = ForwardedSignals::listen().unwrap();
    raise(Sig::SIGQUIT).unwrap();

    // other tests in this binary may raise their own signals
    let wait_for_quit = async {
        while signals.recv().await != Sig::SIGQUIT as i32 {}
    };
    tokio::time::timeout(Duration::from_secs(5), wait_for_quit)
        .await
        .unwrap();

    raise(Sig::SIGQUIT).unwrap();
    // give the signal driver time to record it
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(signals.drain().contains(&(Sig::SIGQUIT as i32)));
    assert!(!signals.drain().contains(&(Sig::SIGQUIT as i32)));
}

#[rstest]
fn test_none_drains_nothing() {
    assert!(ForwardedSignals::none().drain().is_empty());
}
