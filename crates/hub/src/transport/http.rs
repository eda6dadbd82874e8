// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the client management API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::HubState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub client_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeprovisionResponse {
    pub id: String,
    pub removed: bool,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    let count = s.registry.list_clients().await.len();
    Json(HealthResponse { status: "running".to_owned(), client_count: count })
}

/// `POST /api/v1/clients/provision` — provision (or rotate) a client.
///
/// Returns the raw signed token string. The token record itself never leaves
/// the hub.
pub async fn provision_client(
    State(s): State<Arc<HubState>>,
    Json(req): Json<ProvisionRequest>,
) -> impl IntoResponse {
    let client_id = match req.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => {
            return ApiError::BadRequest
                .to_http_response("missing required field: id")
                .into_response()
        }
    };

    match s.registry.provision(&client_id).await {
        Ok(minted) => minted.token.into_response(),
        Err(e) => e.to_http_response("provisioning failed").into_response(),
    }
}

/// `GET /api/v1/clients` — list all clients.
pub async fn list_clients(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    Json(s.registry.list_clients().await)
}

/// `GET /api/v1/clients/{id}` — get one client; absent → 204 No Content.
pub async fn get_client(
    State(s): State<Arc<HubState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.registry.get_client(&id).await {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// `DELETE /api/v1/clients/{id}` — deprovision a client.
///
/// Distinguishes "removed" from "nothing to remove" so callers can tell a
/// no-op from a failure.
pub async fn deprovision_client(
    State(s): State<Arc<HubState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.registry.deprovision(&id).await {
        Ok(removed) => Json(DeprovisionResponse { id, removed }).into_response(),
        Err(e) => e.to_http_response("deprovisioning failed").into_response(),
    }
}
