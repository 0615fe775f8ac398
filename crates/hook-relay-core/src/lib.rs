//! # Hook-Relay Core
//!
//! Decision pipeline for the hook_relay webhook gateway.
//!
//! An inbound GitHub webhook delivery moves through four gates before it is
//! forwarded to the downstream event-ingestion API:
//!
//! 1. [`SignatureVerifier`] — was the delivery signed with the shared secret?
//! 2. [`AuthorizationFilter`] — may this pull request author trigger work?
//! 3. [`EventTranslator`] — what canonical shape does the event become?
//! 4. [`EmissionPolicy`] — is this canonical event type configured to emit?
//!
//! The [`Dispatcher`] orchestrates gates 2–4 and hands accepted events to an
//! [`EventSink`]. Gate 1 runs earlier, at the HTTP boundary, against the raw
//! request body.
//!
//! This crate performs no I/O of its own; the downstream client and the HTTP
//! surface live in `hook-relay-api`.

// ============================================================================
// Error Types
// ============================================================================

/// Error type for decoding an inbound delivery into a typed source event
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("event kind header is missing or empty")]
    MissingKind,

    #[error("malformed '{kind}' payload: {source}")]
    MalformedPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error type for webhook authentication failures
///
/// Every variant is fail-closed: callers must reject the delivery before any
/// parsing or policy evaluation takes place.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("signature header is missing")]
    MissingSignature,

    #[error("signature header is malformed: {message}")]
    MalformedSignature { message: String },

    #[error("signature does not match payload")]
    Mismatch,
}

// ============================================================================
// Module declarations
// ============================================================================

/// Canonical event envelope forwarded downstream
pub mod event;

/// Typed source events parsed from GitHub deliveries
pub mod source;

/// HMAC signature verification for inbound deliveries
pub mod signature;

/// Authorization filter and emission policy
pub mod policy;

/// Translation from source events to canonical events
pub mod translate;

/// Dispatch orchestration and the downstream sink seam
pub mod dispatch;

// Re-export key types for convenience
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher, EventSink, SinkError, SkipReason};
pub use event::{CanonicalEvent, GitDetails, EVENT_SOURCE};
pub use policy::{AuthorizationFilter, EmissionPolicy};
pub use signature::SignatureVerifier;
pub use source::SourceEvent;
pub use translate::EventTranslator;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
