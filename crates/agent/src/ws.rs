// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One agent connection to the hub.
//!
//! Connects with the current token, reports state if configured, and runs
//! the refresh protocol: an immediate `client.token.refresh` on connect, then
//! one per interval, each answered (on success) by `client.token.issue`
//! carrying the replacement credential.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::credential::TokenStore;
use crate::refresh;

// ---------------------------------------------------------------------------
// Agent -> Hub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    #[serde(rename = "client.token.refresh")]
    TokenRefresh {},
    #[serde(rename = "client.state")]
    State { state: String },
}

// ---------------------------------------------------------------------------
// Hub -> Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubMessage {
    #[serde(rename = "client.token.issue")]
    TokenIssue { token: String, expires: String },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

/// Run one connection with `token` until it drops or `shutdown` fires.
///
/// Returns `Ok(())` on a clean disconnect (the caller decides whether to
/// reconnect) and an error when the connection could not be established.
pub async fn run_connection(
    config: &AgentConfig,
    store: &Arc<TokenStore>,
    token: &str,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let url = config.ws_url(token);
    let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
    info!(hub = %config.hub_url, "connected to hub");

    let (mut ws_tx, mut ws_rx) = stream.split();

    if let Some(ref state) = config.report_state {
        let msg = AgentMessage::State { state: state.clone() };
        ws_tx.send(Message::Text(serde_json::to_string(&msg)?.into())).await?;
    }

    // Exactly one scheduler per live connection; its token is a child of the
    // connection scope so disconnect tears it down before any reconnect.
    let conn_scope = shutdown.child_token();
    let (tick_tx, mut tick_rx) = mpsc::channel(1);
    let scheduler = refresh::spawn(tick_tx, config.refresh_interval(), conn_scope.clone());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            Some(refresh::RefreshTick) = tick_rx.recv() => {
                debug!("requesting token refresh");
                let msg = AgentMessage::TokenRefresh {};
                if let Ok(text) = serde_json::to_string(&msg) {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!(err = %e, "connection error");
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => handle_hub_message(store, &text),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    conn_scope.cancel();
    let _ = scheduler.await;
    info!("disconnected from hub");
    Ok(())
}

/// Apply a single hub message. Issuances are persisted even when the
/// connection is already on its way down — they speak to credential
/// validity, not connection liveness.
fn handle_hub_message(store: &TokenStore, text: &str) {
    let msg: HubMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(err = %e, "ignoring unrecognized hub message");
            return;
        }
    };

    match msg {
        HubMessage::TokenIssue { token, expires } => {
            let parsed: Option<DateTime<Utc>> = match DateTime::parse_from_rfc3339(&expires) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    warn!(err = %e, "issued token has unparseable expiry, storing without");
                    None
                }
            };
            match store.save(&token, parsed.as_ref()) {
                Ok(()) => info!(expires = %expires, "refreshed token persisted"),
                Err(e) => warn!(err = %e, "failed to persist refreshed token"),
            }
        }
        HubMessage::Error { code, message } => {
            warn!(code, message, "hub reported an error");
        }
    }
}

/// Capped exponential reconnect backoff.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let ms = 500u64.saturating_mul(2u64.saturating_pow(attempt.min(6)));
    Duration::from_millis(ms.min(30_000))
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
