// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted token state and cold/warm-start credential resolution.
//!
//! The durable state is two artifacts under the agent state dir: `token`
//! (the raw token string) and `token.expires` (optional cached RFC3339
//! expiry). A missing or garbled expiry artifact means "expiry unknown",
//! never "no token" — the load path must not reject a usable token over
//! metadata.
//!
//! The agent never fabricates a token. Every persisted token was granted
//! explicitly: installed at setup from a configured source, or issued by the
//! hub over a live connection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// A loaded credential: the raw token and its cached expiry, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires: Option<DateTime<Utc>>,
}

/// Durable token storage under the agent state directory.
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join("token")
    }

    fn expires_path(&self) -> PathBuf {
        self.dir.join("token.expires")
    }

    /// Load the persisted credential, or `None` when no token is installed.
    ///
    /// The expiry artifact is read best-effort: unreadable or unparseable
    /// expiry degrades to "unknown" with a warning.
    pub fn load(&self) -> anyhow::Result<Option<Credential>> {
        let token = match std::fs::read_to_string(self.token_path()) {
            Ok(t) => t.trim().to_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if token.is_empty() {
            return Ok(None);
        }

        let expires = match std::fs::read_to_string(self.expires_path()) {
            Ok(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    warn!(err = %e, "ignoring unparseable token expiry");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(err = %e, "ignoring unreadable token expiry");
                None
            }
        };

        Ok(Some(Credential { token, expires }))
    }

    /// Persist a credential. Each artifact is written atomically (tmp +
    /// rename); the token is written first so a crash between the two writes
    /// leaves the new token with at worst a stale (earlier) expiry, which
    /// only makes the agent refresh sooner.
    pub fn save(&self, token: &str, expires: Option<&DateTime<Utc>>) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        write_atomic(&self.token_path(), token)?;
        match expires {
            Some(dt) => write_atomic(&self.expires_path(), dt.to_rfc3339())?,
            None => match std::fs::remove_file(self.expires_path()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        debug!(has_expiry = expires.is_some(), "credential persisted");
        Ok(())
    }
}

/// Atomic file write (write tmp + rename). Unique tmp name so concurrent
/// writers never truncate each other mid-write.
fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Configured credential sources, in priority order.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    /// Explicitly supplied raw token.
    pub token: Option<String>,
    /// Path to a token-bearing file.
    pub token_file: Option<PathBuf>,
    /// Fallback token from the environment/deployment.
    pub fallback_token: Option<String>,
    /// Replace an installed credential instead of keeping it.
    pub force: bool,
}

impl CredentialSources {
    fn is_configured(&self) -> bool {
        self.token.is_some() || self.token_file.is_some()
    }

    /// Resolve the first available source, short-circuit in priority order.
    fn resolve(&self) -> Option<String> {
        if let Some(ref raw) = self.token {
            let raw = raw.trim();
            if !raw.is_empty() {
                return Some(raw.to_owned());
            }
        }
        if let Some(ref path) = self.token_file {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    let trimmed = contents.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_owned());
                    }
                    warn!(path = %path.display(), "token file is empty, trying next source");
                }
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "cannot read token file, trying next source");
                }
            }
        }
        self.fallback_token.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned)
    }
}

/// Resolve the credential to run with, persisting it before any connection
/// attempt.
///
/// Warm start: an installed token always wins unless `force` is set; a
/// conflicting supplied token is logged and ignored so a stray flag cannot
/// clobber a live credential. Cold start (or `force`): sources are evaluated
/// in order and the granted token is installed. No usable source on a cold
/// start is a fatal setup error.
pub fn setup(store: &TokenStore, sources: &CredentialSources) -> anyhow::Result<Credential> {
    if !sources.force {
        if let Some(persisted) = store.load()? {
            if sources.is_configured() {
                info!("token already installed; ignoring supplied token (use --force-token to replace)");
            }
            debug!(has_expiry = persisted.expires.is_some(), "using persisted token");
            return Ok(persisted);
        }
    }

    let Some(token) = sources.resolve() else {
        anyhow::bail!(
            "no usable credential: supply --token, --token-file, or a fallback token"
        );
    };

    store.save(&token, None)?;
    info!(forced = sources.force, "token installed");
    Ok(Credential { token, expires: None })
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
