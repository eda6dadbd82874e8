// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn first_tick_is_immediate() {
    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let handle = spawn(tx, Duration::from_secs(8 * 3600), cancel.clone());

    // No time has to pass for the first tick.
    assert_eq!(rx.recv().await, Some(RefreshTick));

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(start_paused = true)]
async fn ticks_repeat_at_the_configured_interval() {
    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let interval = Duration::from_secs(8 * 3600);
    let handle = spawn(tx, interval, cancel.clone());

    assert_eq!(rx.recv().await, Some(RefreshTick));

    tokio::time::advance(interval).await;
    assert_eq!(rx.recv().await, Some(RefreshTick));

    tokio::time::advance(interval).await;
    assert_eq!(rx.recv().await, Some(RefreshTick));

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_ticks() {
    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let interval = Duration::from_secs(60);
    let handle = spawn(tx, interval, cancel.clone());

    assert_eq!(rx.recv().await, Some(RefreshTick));
    cancel.cancel();
    let _ = handle.await;

    // Even after the interval elapses, no further ticks arrive.
    tokio::time::advance(interval * 3).await;
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn scheduler_stops_when_receiver_drops() {
    let (tx, rx) = mpsc::channel(4);
    let handle = spawn(tx, Duration::from_secs(60), CancellationToken::new());
    drop(rx);

    // The task exits on its next send attempt.
    tokio::time::advance(Duration::from_secs(60)).await;
    let _ = handle.await;
}
