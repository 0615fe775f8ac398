//! Signature-verifying middleware stage.
//!
//! Every request to the webhook endpoint passes through [`verify_webhook`]
//! before the handler runs. The stage either short-circuits with a failure
//! response or passes the request on with its body intact:
//!
//! 1. content-type gate — anything other than JSON or form-urlencoded is
//!    rejected with 400 *before* authentication;
//! 2. the raw body is buffered and the HMAC signature from
//!    `X-Hub-Signature-256` (or the legacy `X-Hub-Signature`) is verified
//!    against those exact bytes;
//! 3. on success the buffered body is restored so the handler reads the same
//!    bytes the signature covered.
//!
//! Verification always runs on the body as received. Re-encoding first (for
//! form payloads, extracting the `payload` field) would recompute the digest
//! over different bytes and reject genuine deliveries.

use crate::errors::GatewayError;
use crate::AppState;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hook_relay_core::AuthenticationError;

/// Header carrying the HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Legacy header carrying the HMAC-SHA1 signature.
pub const SIGNATURE_HEADER_LEGACY: &str = "x-hub-signature";

/// Header naming the source-event kind.
pub const EVENT_KIND_HEADER: &str = "x-github-event";

/// Header carrying the upstream delivery identifier, used for log correlation.
pub const DELIVERY_ID_HEADER: &str = "x-github-delivery";

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";
pub(crate) const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Middleware entry point: authenticate or short-circuit.
pub async fn verify_webhook(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(error) => error.into_response(),
    }
}

/// Run the content-type gate and signature verification, returning the
/// request with its buffered body restored for the handler.
async fn authenticate(state: &AppState, request: Request) -> Result<Request, GatewayError> {
    let content_type = media_type(request.headers());
    if content_type != CONTENT_TYPE_JSON && content_type != CONTENT_TYPE_FORM {
        return Err(GatewayError::UnsupportedContentType { content_type });
    }

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .or_else(|| request.headers().get(SIGNATURE_HEADER_LEGACY))
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or(AuthenticationError::MissingSignature)?;

    let (parts, body) = request.into_parts();
    let body_bytes = to_bytes(body, state.config.server.max_body_size)
        .await
        .map_err(|error| GatewayError::UnreadableBody {
            message: error.to_string(),
        })?;

    state.verifier.verify(&signature, &body_bytes)?;

    Ok(Request::from_parts(parts, Body::from(body_bytes)))
}

/// The request's media type with any parameters (e.g. `; charset=utf-8`)
/// stripped.
pub(crate) fn media_type(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
