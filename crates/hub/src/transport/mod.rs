// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the hub.

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::HubState;

/// Build the axum `Router` with all hub routes.
pub fn build_router(state: Arc<HubState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        // Client management
        .route("/api/v1/clients", get(http::list_clients))
        .route("/api/v1/clients/provision", post(http::provision_client))
        .route("/api/v1/clients/{id}", get(http::get_client).delete(http::deprovision_client))
        // Agent connections (token-authenticated in the handler)
        .route("/ws", get(ws::ws_handler))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
