// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection refresh scheduler.
//!
//! One scheduler task is live per active connection: it fires once
//! immediately on connect, then at a fixed interval for the lifetime of the
//! connection. Its cancellation token is a child of the connection scope, so
//! tearing down the connection always stops the scheduler before a reconnect
//! can arm a new one.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A tick instructing the connection loop to send a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTick;

/// Spawn the refresh scheduler for one connection.
///
/// Ticks are delivered over `tx`; the first fires immediately. The task
/// exits when `cancel` fires or the receiving side goes away.
pub fn spawn(
    tx: mpsc::Sender<RefreshTick>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if tx.send(RefreshTick).await.is_err() {
                debug!("refresh scheduler receiver dropped, stopping");
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    debug!("refresh scheduler cancelled");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
