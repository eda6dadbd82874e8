// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket handler for persistent agent connections.
//!
//! The presented identity token is verified through the registry before the
//! upgrade; the socket is then bound to the resolved client identity for its
//! lifetime. Messages use internally-tagged JSON (`{"type": ...}`).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::state::HubState;

// ---------------------------------------------------------------------------
// Agent -> Hub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    /// Request token rotation for the bound identity.
    #[serde(rename = "client.token.refresh")]
    TokenRefresh {},
    /// Self-reported status, stored verbatim.
    #[serde(rename = "client.state")]
    State { state: String },
}

// ---------------------------------------------------------------------------
// Hub -> Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubMessage {
    /// Rotation result: the new token and its expiry (RFC3339).
    #[serde(rename = "client.token.issue")]
    TokenIssue { token: String, expires: String },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

/// Query parameters for the WS upgrade.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=...` — WebSocket upgrade for an agent connection.
pub async fn ws_handler(
    State(state): State<Arc<HubState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(ref token) = query.token else {
        return unauthorized("missing token");
    };

    // Resolve the presented token to a client identity before upgrading.
    let client = match state.registry.verify(token).await {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(err = %e, "ws connection rejected");
            return unauthorized(e.reason().unwrap_or("unauthorized"));
        }
    };

    let client_id = client.id;
    ws.on_upgrade(move |socket| handle_connection(state, socket, client_id)).into_response()
}

fn unauthorized(reason: &str) -> axum::response::Response {
    axum::http::Response::builder()
        .status(401)
        .body(axum::body::Body::from(reason.to_owned()))
        .unwrap_or_default()
        .into_response()
}

/// Per-connection event loop, bound to a verified client identity.
async fn handle_connection(state: Arc<HubState>, socket: WebSocket, client_id: String) {
    tracing::info!(client = %client_id, "agent connected");
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(_)) | None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let agent_msg: AgentMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let err = HubMessage::Error {
                                    code: "BAD_REQUEST".to_owned(),
                                    message: "invalid message".to_owned(),
                                };
                                if send_json(&mut ws_tx, &err).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };

                        if let Some(reply) = handle_agent_message(&state, &client_id, agent_msg).await {
                            if send_json(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(client = %client_id, "agent disconnected");
}

/// Handle a single agent message and optionally return a reply.
async fn handle_agent_message(
    state: &HubState,
    client_id: &str,
    msg: AgentMessage,
) -> Option<HubMessage> {
    match msg {
        AgentMessage::TokenRefresh {} => {
            // Rotation reuses the provisioning mint step but never creates a
            // client: a deprovisioned identity gets no usable token.
            match state.registry.rotate(client_id).await {
                Ok(minted) => Some(HubMessage::TokenIssue {
                    token: minted.token,
                    expires: minted.expires.to_rfc3339(),
                }),
                Err(e) => {
                    // Logged server-side only; the agent keeps its current
                    // token until natural expiry.
                    tracing::warn!(client = %client_id, err = %e, "token refresh failed");
                    None
                }
            }
        }

        AgentMessage::State { state: reported } => {
            if let Err(e) = state.registry.record_state(client_id, &reported).await {
                tracing::warn!(client = %client_id, err = %e, "state report failed");
            }
            None
        }
    }
}

/// Send a JSON-serialized message over the WebSocket.
async fn send_json<S>(tx: &mut S, msg: &HubMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = match serde_json::to_string(msg) {
        Ok(t) => t,
        Err(_) => return Err(()),
    };
    tx.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
