// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the hub API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Unknown client on get/delete/rotate.
    NotFound,
    /// Missing or empty required field.
    BadRequest,
    /// Token invalid, expired, or subject no longer registered. Carries the
    /// status code reported by the token authority and a short
    /// machine-readable reason.
    AuthFailed { status: u16, reason: &'static str },
    /// Management API bearer auth failed.
    Unauthorized,
    /// Record store or token authority unreachable.
    BackendUnavailable,
    Internal,
}

impl ApiError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::AuthFailed { status, .. } => *status,
            Self::Unauthorized => 401,
            Self::BackendUnavailable => 503,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::AuthFailed { .. } => "AUTH_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BackendUnavailable => "BACKEND_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Short machine-readable reason, where one exists.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::AuthFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody {
            code: self.as_str().to_owned(),
            message: message.into(),
            reason: self.reason().map(str::to_owned),
        }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailed { reason, .. } => write!(f, "AUTH_FAILED ({reason})"),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
