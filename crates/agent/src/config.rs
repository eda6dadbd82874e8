// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the tether agent.
#[derive(Debug, Clone, clap::Parser)]
pub struct AgentConfig {
    /// Base URL of the hub (e.g. `ws://127.0.0.1:9600`).
    #[arg(long, default_value = "ws://127.0.0.1:9600", env = "TETHER_HUB_URL")]
    pub hub_url: String,

    /// Raw identity token to install on cold start.
    #[arg(long, env = "TETHER_AGENT_TOKEN")]
    pub token: Option<String>,

    /// Path to a file containing the identity token.
    #[arg(long, env = "TETHER_AGENT_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Fallback token used when no other source is available (e.g. baked into
    /// the deployment environment).
    #[arg(long, env = "TETHER_AGENT_FALLBACK_TOKEN")]
    pub fallback_token: Option<String>,

    /// Replace an already-installed credential with the supplied one. Without
    /// this flag a persisted token always wins.
    #[arg(long, default_value_t = false, env = "TETHER_AGENT_FORCE_TOKEN")]
    pub force_token: bool,

    /// State directory for the persisted token. Defaults to
    /// `$XDG_STATE_HOME/tether/agent` (or `$HOME/.local/state/tether/agent`).
    #[arg(long, env = "TETHER_AGENT_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Seconds between refresh requests on a live connection (default 8h).
    #[arg(long, default_value_t = 8 * 3600, env = "TETHER_AGENT_REFRESH_SECS")]
    pub refresh_interval_secs: u64,

    /// Status string reported to the hub after connecting.
    #[arg(long, env = "TETHER_AGENT_STATE")]
    pub report_state: Option<String>,
}

impl AgentConfig {
    /// Resolve the state directory, falling back to XDG conventions.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("tether/agent");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/tether/agent");
        }
        PathBuf::from(".tether/agent")
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Full WebSocket URL for an agent connection with `token` attached.
    pub fn ws_url(&self, token: &str) -> String {
        format!("{}/ws?token={token}", self.hub_url.trim_end_matches('/'))
    }
}
