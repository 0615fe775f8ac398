//! Error types for the HTTP surface.
//!
//! The response contract is deliberately opaque: every response — success or
//! failure — carries the fixed JSON body `{}`, and only the HTTP status
//! conveys the outcome. A sender can distinguish "accepted" from "rejected"
//! but never "forwarded" from "intentionally skipped".

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use hook_relay_core::{AuthenticationError, DispatchError, ParseError};
use tracing::{error, warn};

/// The fixed response body returned on every outcome.
pub const EMPTY_OBJECT: &str = "{}";

/// Build the fixed `{}` response with the given status.
pub fn empty_object_response(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        EMPTY_OBJECT,
    )
        .into_response()
}

/// Everything that can go wrong while handling `POST /events`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request rejected before authentication
    ///
    /// Maps to: `400 Bad Request`
    #[error("unsupported content type: '{content_type}'")]
    UnsupportedContentType { content_type: String },

    /// Signature missing, malformed, or mismatched
    ///
    /// Maps to: `500 Internal Server Error` — deliberately not distinguished
    /// from other server-side failures in the response contract.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    /// The request body could not be read
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("request body could not be read: {message}")]
    UnreadableBody { message: String },

    /// Kind header missing or payload undecodable
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("payload could not be parsed: {0}")]
    Parse(#[from] ParseError),

    /// The downstream forward failed
    ///
    /// Maps to: `500 Internal Server Error`; no internal retry — the
    /// upstream sender retries whole deliveries.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnsupportedContentType { content_type } => {
                warn!(content_type = %content_type, "rejecting delivery with unsupported content type");
                StatusCode::BAD_REQUEST
            }
            Self::Authentication(source) => {
                warn!(error = %source, "rejecting unauthenticated delivery");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UnreadableBody { message } => {
                error!(error = %message, "failed to read request body");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Parse(source) => {
                error!(error = %source, "failed to parse delivery payload");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Dispatch(source) => {
                error!(error = %source, "failed to forward event downstream");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        empty_object_response(status)
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
