// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token authority: mints, verifies, and revokes signed identity tokens.
//!
//! Tokens are opaque to everything outside this module: a base64url JSON
//! payload (`{id, sub, exp}`) joined to a base64url HMAC-SHA256 tag. The
//! signing key and the token-record table are persisted under the hub state
//! directory so issued tokens survive hub restarts. A token is only valid
//! while its record exists — revoking the record invalidates the credential
//! even though the signature still checks out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Signing key length in bytes.
const KEY_LEN: usize = 32;

/// Record of an issued token, keyed by token id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Unique token id, independent of the signed representation.
    pub id: String,
    /// Client identity this token authenticates.
    pub subject: String,
    /// Absolute expiry.
    pub expires: DateTime<Utc>,
}

/// A freshly minted token, returned to the caller that requested it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: String,
    /// The signed wire representation handed to the client.
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Claims recovered from a successfully verified token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub id: String,
    pub subject: String,
    pub expires: DateTime<Utc>,
}

/// Why a presented token failed verification.
///
/// `status` is the HTTP-ish status code the authority reports; `reason` is a
/// short machine-readable tag safe to surface to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyFailure {
    pub status: u16,
    pub reason: &'static str,
}

impl VerifyFailure {
    const fn unauthorized(reason: &'static str) -> Self {
        Self { status: 401, reason }
    }
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason, self.status)
    }
}

/// Signed token payload (the part that gets HMAC'd).
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    id: String,
    sub: String,
    exp: DateTime<Utc>,
}

/// Persisted token-record table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedTokens {
    tokens: HashMap<String, TokenRecord>,
}

/// The token authority service. Explicitly constructed, shared via `Arc`.
pub struct TokenAuthority {
    key: ring::hmac::Key,
    records: RwLock<HashMap<String, TokenRecord>>,
    ttl: chrono::Duration,
    tokens_path: PathBuf,
}

impl TokenAuthority {
    /// Open (or initialize) the authority under `dir`.
    ///
    /// Loads the signing key and token table if present; otherwise generates
    /// a fresh key and starts with an empty table.
    pub fn open(dir: &Path, ttl: chrono::Duration) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let key_path = dir.join("signing.key");
        let key_bytes = match std::fs::read_to_string(&key_path) {
            Ok(encoded) => URL_SAFE_NO_PAD
                .decode(encoded.trim())
                .map_err(|e| anyhow::anyhow!("corrupt signing key {}: {e}", key_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut bytes = [0u8; KEY_LEN];
                ring::rand::SystemRandom::new()
                    .fill(&mut bytes)
                    .map_err(|_| anyhow::anyhow!("system rng unavailable"))?;
                crate::registry::store::write_atomic(&key_path, URL_SAFE_NO_PAD.encode(bytes))?;
                bytes.to_vec()
            }
            Err(e) => return Err(e.into()),
        };
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, &key_bytes);

        let tokens_path = dir.join("tokens.json");
        let records = match std::fs::read_to_string(&tokens_path) {
            Ok(contents) => serde_json::from_str::<PersistedTokens>(&contents)?.tokens,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        if !records.is_empty() {
            tracing::info!(count = records.len(), "loaded persisted token records");
        }

        Ok(Self { key, records: RwLock::new(records), ttl, tokens_path })
    }

    /// Mint a signed token for `subject` with the configured TTL.
    ///
    /// The record is persisted before the token is returned; a persistence
    /// failure rolls the record back and surfaces the error.
    pub async fn mint(&self, subject: &str) -> anyhow::Result<IssuedToken> {
        let id = uuid::Uuid::new_v4().to_string();
        let expires = Utc::now() + self.ttl;
        let payload = TokenPayload { id: id.clone(), sub: subject.to_owned(), exp: expires };
        let payload_json = serde_json::to_vec(&payload)?;

        let tag = ring::hmac::sign(&self.key, &payload_json);
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload_json),
            URL_SAFE_NO_PAD.encode(tag.as_ref()),
        );

        // Persist while still holding the write guard: dropping it first
        // would let a later mutation's save land on disk before this one,
        // leaving an on-disk table missing a record whose caller saw success.
        let mut records = self.records.write().await;
        records.insert(
            id.clone(),
            TokenRecord { id: id.clone(), subject: subject.to_owned(), expires },
        );
        let snapshot = PersistedTokens { tokens: records.clone() };
        if let Err(e) = save_tokens(&self.tokens_path, &snapshot) {
            records.remove(&id);
            return Err(e);
        }
        drop(records);

        tracing::debug!(subject, token_id = %id, "token minted");
        Ok(IssuedToken { id, token, expires })
    }

    /// Verify a presented token: shape, signature, expiry, record existence.
    pub async fn verify(&self, presented: &str) -> Result<TokenClaims, VerifyFailure> {
        const MALFORMED: VerifyFailure = VerifyFailure::unauthorized("malformed");

        let (payload_b64, tag_b64) = presented.split_once('.').ok_or(MALFORMED)?;
        let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| MALFORMED)?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| MALFORMED)?;

        // Constant-time signature check.
        ring::hmac::verify(&self.key, &payload_json, &tag)
            .map_err(|_| VerifyFailure::unauthorized("bad_signature"))?;

        let payload: TokenPayload =
            serde_json::from_slice(&payload_json).map_err(|_| MALFORMED)?;

        if payload.exp <= Utc::now() {
            return Err(VerifyFailure::unauthorized("expired"));
        }

        // The signature alone is not enough: a rotated-away or revoked token
        // has no record and must be rejected.
        let records = self.records.read().await;
        if !records.contains_key(&payload.id) {
            return Err(VerifyFailure::unauthorized("superseded"));
        }

        Ok(TokenClaims { id: payload.id, subject: payload.sub, expires: payload.exp })
    }

    /// Revoke a token record, invalidating the credential. Returns whether a
    /// record was removed.
    pub async fn revoke(&self, token_id: &str) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        let Some(removed) = records.remove(token_id) else {
            return Ok(false);
        };

        // Save under the guard, same discipline as `mint`.
        let snapshot = PersistedTokens { tokens: records.clone() };
        if let Err(e) = save_tokens(&self.tokens_path, &snapshot) {
            records.insert(token_id.to_owned(), removed);
            return Err(e);
        }
        drop(records);

        tracing::debug!(token_id, "token revoked");
        Ok(true)
    }
}

fn save_tokens(path: &Path, tokens: &PersistedTokens) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(tokens)?;
    crate::registry::store::write_atomic(path, json)
}

#[cfg(test)]
#[path = "authority_tests.rs"]
mod tests;
