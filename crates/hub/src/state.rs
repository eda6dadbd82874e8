// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::registry::ClientRegistry;

/// Shared hub state.
pub struct HubState {
    pub registry: Arc<ClientRegistry>,
    pub config: HubConfig,
    pub shutdown: CancellationToken,
}

impl HubState {
    pub fn new(
        config: HubConfig,
        registry: Arc<ClientRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { registry, config, shutdown }
    }
}
