// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tether agent: holds a hub-issued identity token, keeps it fresh over a
//! persistent connection, and survives restarts from local state.

pub mod config;
pub mod credential;
pub mod refresh;
pub mod ws;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::credential::{CredentialSources, TokenStore};

/// Run the agent until shutdown.
///
/// Credential setup happens before the first connection attempt; with no
/// usable credential this returns an error and the process aborts startup.
/// After setup the agent reconnects forever with capped backoff, re-reading
/// the persisted token on every attempt so a rotation from the previous
/// connection is picked up.
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let store = Arc::new(TokenStore::new(config.state_dir()));
    let sources = CredentialSources {
        token: config.token.clone(),
        token_file: config.token_file.clone(),
        fallback_token: config.fallback_token.clone(),
        force: config.force_token,
    };
    credential::setup(&store, &sources)?;

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            ctrl_c_shutdown.cancel();
        }
    });

    let mut attempt: u32 = 0;
    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        // Rotations persist between connections; always connect with the
        // latest installed token.
        let credential = credential::setup(&store, &CredentialSources::default())?;

        match ws::run_connection(&config, &store, &credential.token, &shutdown).await {
            Ok(()) => {
                if shutdown.is_cancelled() {
                    return Ok(());
                }
                attempt = 0;
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                warn!(err = %e, attempt, "connection failed");
            }
        }

        let delay = ws::backoff_delay(attempt);
        debug!(delay_ms = delay.as_millis() as u64, "reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => return Ok(()),
        }
    }
}
