// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tether hub: registry and token lifecycle for tethered client agents.

pub mod authority;
pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::authority::TokenAuthority;
use crate::config::HubConfig;
use crate::registry::ClientRegistry;
use crate::state::HubState;
use crate::transport::build_router;

/// Run the hub server until shutdown.
pub async fn run(config: HubConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state_dir = config.state_dir();
    let authority = Arc::new(TokenAuthority::open(&state_dir, config.token_ttl())?);
    let registry = Arc::new(ClientRegistry::open(&state_dir, authority)?);

    let state = Arc::new(HubState::new(config, registry, shutdown.clone()));

    tracing::info!("tether-hub listening on {addr}");

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            ctrl_c_shutdown.cancel();
        }
    });

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
