// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client registry: owns the mapping from external client identity to its
//! record and drives the token lifecycle through the token authority.
//!
//! Operations on the same client identity serialize through a keyed lock so
//! `current_token_id` always reflects the most recently minted token;
//! operations on different identities never block each other. Verification
//! is read-mostly and runs fully concurrently.

pub mod store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::authority::{IssuedToken, TokenAuthority};
use crate::error::ApiError;
use crate::registry::store::PersistedClients;

/// A provisioned client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Externally assigned identity. Unique, immutable after creation.
    pub id: String,
    /// Registry-assigned storage identity. Immutable.
    pub internal_id: String,
    pub created: DateTime<Utc>,
    /// Bumped on every provisioning, refresh, or state event.
    pub updated: DateTime<Utc>,
    /// Reference to the active token record. At most one live token per
    /// client at any time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_token_id: Option<String>,
    /// Last self-reported status, stored verbatim. Absent until first report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// The client registry service. Explicitly constructed, shared via `Arc`.
pub struct ClientRegistry {
    authority: Arc<TokenAuthority>,
    clients: RwLock<HashMap<String, ClientRecord>>,
    /// Per-identity serialization locks (single writer per key).
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    clients_path: PathBuf,
}

impl ClientRegistry {
    /// Open (or initialize) the registry under `dir`.
    pub fn open(dir: &Path, authority: Arc<TokenAuthority>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let clients_path = dir.join("clients.json");

        let clients = match store::load(&clients_path) {
            Ok(persisted) => persisted.clients,
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        if !clients.is_empty() {
            tracing::info!(count = clients.len(), "loaded persisted client records");
        }

        Ok(Self {
            authority,
            clients: RwLock::new(clients),
            locks: Mutex::new(HashMap::new()),
            clients_path,
        })
    }

    /// Get the serialization lock for a client identity.
    async fn lock_for(&self, client_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(client_id.to_owned()).or_default())
    }

    /// Provision a client: create-or-rotate, idempotent by identity.
    ///
    /// Mints a new token, swaps `current_token_id` and persists the record,
    /// then revokes the superseded token. The caller receives exactly the
    /// token minted on its behalf.
    pub async fn provision(&self, client_id: &str) -> Result<IssuedToken, ApiError> {
        self.mint_for(client_id, true).await
    }

    /// Rotate the token for an existing client (the refresh path).
    ///
    /// Unlike [`provision`](Self::provision), never creates a client:
    /// rotation for an unknown identity fails with `not_found`.
    pub async fn rotate(&self, client_id: &str) -> Result<IssuedToken, ApiError> {
        self.mint_for(client_id, false).await
    }

    async fn mint_for(&self, client_id: &str, create: bool) -> Result<IssuedToken, ApiError> {
        let guard = self.lock_for(client_id).await;
        let _serialized = guard.lock().await;

        if !create && !self.clients.read().await.contains_key(client_id) {
            return Err(ApiError::NotFound);
        }

        let minted = self.authority.mint(client_id).await.map_err(|e| {
            tracing::warn!(client = client_id, err = %e, "token mint failed");
            ApiError::BackendUnavailable
        })?;

        let now = Utc::now();
        let old_token_id = {
            let mut clients = self.clients.write().await;
            let previous = clients.get(client_id).cloned();
            let old_token_id = previous.as_ref().and_then(|r| r.current_token_id.clone());
            match clients.get_mut(client_id) {
                Some(record) => {
                    record.current_token_id = Some(minted.id.clone());
                    record.updated = now;
                }
                None => {
                    clients.insert(
                        client_id.to_owned(),
                        ClientRecord {
                            id: client_id.to_owned(),
                            internal_id: uuid::Uuid::new_v4().to_string(),
                            created: now,
                            updated: now,
                            current_token_id: Some(minted.id.clone()),
                            state: None,
                        },
                    );
                }
            }

            // Persist while still holding the write guard so concurrent
            // mutations cannot land on disk in inverted order.
            let snapshot = PersistedClients { clients: clients.clone() };
            if let Err(e) = store::save(&self.clients_path, &snapshot) {
                tracing::warn!(client = client_id, err = %e, "client record persist failed");
                match previous {
                    Some(prev) => {
                        clients.insert(client_id.to_owned(), prev);
                    }
                    None => {
                        clients.remove(client_id);
                    }
                }
                // The replacement token was never handed out; it must not
                // stay live after the aborted swap.
                if let Err(e) = self.authority.revoke(&minted.id).await {
                    tracing::warn!(client = client_id, err = %e, "aborted token revoke failed");
                }
                return Err(ApiError::BackendUnavailable);
            }
            old_token_id
        };

        // Supersede only after the new credential is durably committed: a
        // failed provision must leave the client's prior token verifiable.
        if let Some(ref old_id) = old_token_id {
            if let Err(e) = self.authority.revoke(old_id).await {
                tracing::warn!(client = client_id, err = %e, "superseded token revoke failed");
            }
        }

        tracing::info!(client = client_id, token_id = %minted.id, "token issued");
        Ok(minted)
    }

    /// Deprovision a client. Returns `false` (not an error) when no such
    /// client exists; on success both the client record and its token record
    /// are gone.
    pub async fn deprovision(&self, client_id: &str) -> Result<bool, ApiError> {
        let guard = self.lock_for(client_id).await;
        let _serialized = guard.lock().await;

        let mut clients = self.clients.write().await;
        let Some(record) = clients.get(client_id).cloned() else {
            return Ok(false);
        };

        // Invalidate the credential first; the record write below excludes
        // the client, so a failure between the two steps never leaves a
        // valid token for a removed client.
        if let Some(ref token_id) = record.current_token_id {
            self.authority.revoke(token_id).await.map_err(|e| {
                tracing::warn!(client = client_id, err = %e, "token revoke failed");
                ApiError::BackendUnavailable
            })?;
        }

        clients.remove(client_id);
        let snapshot = PersistedClients { clients: clients.clone() };
        if let Err(e) = store::save(&self.clients_path, &snapshot) {
            tracing::warn!(client = client_id, err = %e, "client record persist failed");
            clients.insert(client_id.to_owned(), record);
            return Err(ApiError::BackendUnavailable);
        }
        drop(clients);

        tracing::info!(client = client_id, "client deprovisioned");
        Ok(true)
    }

    /// Look up a single client record.
    pub async fn get_client(&self, client_id: &str) -> Option<ClientRecord> {
        self.clients.read().await.get(client_id).cloned()
    }

    /// Snapshot of all client records. Ordering unspecified.
    pub async fn list_clients(&self) -> Vec<ClientRecord> {
        self.clients.read().await.values().cloned().collect()
    }

    /// Verify a presented token and resolve it to a client record.
    ///
    /// Signature and expiry checks are delegated to the token authority; the
    /// registry then resolves the subject. A verified signature whose subject
    /// is no longer registered (deprovisioned after issuance) is a failure —
    /// the registry is the source of truth for client existence.
    pub async fn verify(&self, presented: &str) -> Result<ClientRecord, ApiError> {
        let claims = self
            .authority
            .verify(presented)
            .await
            .map_err(|f| ApiError::AuthFailed { status: f.status, reason: f.reason })?;

        self.clients
            .read()
            .await
            .get(&claims.subject)
            .cloned()
            .ok_or(ApiError::AuthFailed { status: 401, reason: "unknown_client" })
    }

    /// Record a client's self-reported state string, verbatim.
    pub async fn record_state(&self, client_id: &str, state: &str) -> Result<(), ApiError> {
        let guard = self.lock_for(client_id).await;
        let _serialized = guard.lock().await;

        let mut clients = self.clients.write().await;
        let Some(record) = clients.get_mut(client_id) else {
            return Err(ApiError::NotFound);
        };
        let previous = record.clone();
        record.state = Some(state.to_owned());
        record.updated = Utc::now();

        let snapshot = PersistedClients { clients: clients.clone() };
        if let Err(e) = store::save(&self.clients_path, &snapshot) {
            tracing::warn!(client = client_id, err = %e, "client record persist failed");
            clients.insert(client_id.to_owned(), previous);
            return Err(ApiError::BackendUnavailable);
        }
        drop(clients);

        tracing::debug!(client = client_id, state, "client state recorded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
