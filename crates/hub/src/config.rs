// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// Configuration for the tether hub.
#[derive(Debug, Clone, clap::Parser)]
pub struct HubConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "TETHER_HUB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9600, env = "TETHER_HUB_PORT")]
    pub port: u16,

    /// Bearer token for the management API. If unset, auth is disabled.
    #[arg(long, env = "TETHER_HUB_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// State directory for client and token records. Defaults to
    /// `$XDG_STATE_HOME/tether/hub` (or `$HOME/.local/state/tether/hub`).
    #[arg(long, env = "TETHER_HUB_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Lifetime of issued tokens in seconds (default 30 days).
    #[arg(long, default_value_t = 30 * 24 * 3600, env = "TETHER_HUB_TOKEN_TTL_SECS")]
    pub token_ttl_secs: u64,
}

impl HubConfig {
    /// Resolve the state directory, falling back to XDG conventions.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("tether/hub");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/tether/hub");
        }
        PathBuf::from(".tether/hub")
    }

    /// Configured token lifetime. Out-of-range values saturate instead of
    /// wrapping into a negative TTL.
    pub fn token_ttl(&self) -> chrono::Duration {
        i64::try_from(self.token_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
