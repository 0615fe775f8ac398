//! Dispatch orchestration.
//!
//! [`Dispatcher::handle`] takes a parsed source event through the remaining
//! gates in order:
//!
//! 1. authorization filter (pull-request events only),
//! 2. ref-deletion rule (push events only),
//! 3. translation to the canonical envelope,
//! 4. emission policy,
//! 5. forward to the downstream [`EventSink`].
//!
//! Every gate that stops the event resolves to a
//! [`DispatchOutcome::Skipped`] — a successful no-forward, logged but
//! indistinguishable from a forward at the HTTP layer. Only a downstream
//! forward failure is a hard error.

use crate::event::CanonicalEvent;
use crate::policy::{AuthorizationFilter, EmissionPolicy};
use crate::source::SourceEvent;
use crate::translate::EventTranslator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

// ============================================================================
// EventSink
// ============================================================================

/// Error type for downstream forwarding failures.
///
/// No retry semantics here: the upstream sender retries whole deliveries, and
/// the downstream ingestion API owns its own transport behavior.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("event ingestion request failed: {message}")]
    Request { message: String },

    #[error("event ingestion API returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Seam to the downstream event-ingestion API.
///
/// The concrete HTTP client lives in `hook-relay-api`; the dispatcher only
/// ever forwards through this trait, which keeps the pipeline testable with
/// an in-memory sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Forward one canonical event. Called at most once per inbound delivery.
    async fn create_event(&self, event: &CanonicalEvent) -> Result<(), SinkError>;
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why an event was intentionally not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fork pull request from an author outside the allow-list
    DisallowedAuthor,
    /// Pull-request action outside the supported set
    UnsupportedAction,
    /// Push that deleted its ref
    RefDeleted,
    /// Event kind outside the supported set
    UnsupportedKind,
    /// Emission policy did not match the canonical type
    NotEmitted,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisallowedAuthor => "disallowed_author",
            Self::UnsupportedAction => "unsupported_action",
            Self::RefDeleted => "ref_deleted",
            Self::UnsupportedKind => "unsupported_kind",
            Self::NotEmitted => "not_emitted",
        }
    }
}

/// Terminal state of handling one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The canonical event was handed to the downstream sink
    Forwarded,
    /// The event was intentionally dropped; success with no forward
    Skipped(SkipReason),
}

/// Hard failure while handling a delivery.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("downstream forward failed: {0}")]
    Forward(#[from] SinkError),
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Orchestrates authorization, translation, emission policy, and forwarding.
///
/// Immutable after construction; shared across request handlers behind an
/// `Arc`. Each call to [`Dispatcher::handle`] is independent — there is no
/// per-dispatcher mutable state, queue, or lock.
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
    authorization: AuthorizationFilter,
    emission: EmissionPolicy,
    translator: EventTranslator,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn EventSink>,
        authorization: AuthorizationFilter,
        emission: EmissionPolicy,
    ) -> Self {
        Self {
            sink,
            authorization,
            emission,
            translator: EventTranslator::new(),
        }
    }

    /// Handle one parsed delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Forward`] only when the downstream forward
    /// itself fails; every policy rejection is a successful
    /// [`DispatchOutcome::Skipped`].
    #[instrument(skip(self, event, payload), fields(kind = event.kind()))]
    pub async fn handle(
        &self,
        event: &SourceEvent,
        payload: &[u8],
    ) -> Result<DispatchOutcome, DispatchError> {
        if let SourceEvent::PullRequest(pull_request_event) = event {
            if let Some(reason) = self.authorization.evaluate(pull_request_event) {
                return Ok(DispatchOutcome::Skipped(reason));
            }
        }

        if let SourceEvent::Push(push_event) = event {
            if push_event.deleted {
                info!(git_ref = %push_event.git_ref, "skipping push for deleted ref");
                return Ok(DispatchOutcome::Skipped(SkipReason::RefDeleted));
            }
        }

        let Some(canonical) = self.translator.translate(event, payload) else {
            info!(kind = event.kind(), "skipping unsupported event kind");
            return Ok(DispatchOutcome::Skipped(SkipReason::UnsupportedKind));
        };

        if !self.emission.should_emit(&canonical.event_type) {
            info!(
                event_type = %canonical.event_type,
                "event type excluded by emission policy"
            );
            return Ok(DispatchOutcome::Skipped(SkipReason::NotEmitted));
        }

        self.sink.create_event(&canonical).await?;

        info!(
            event_type = %canonical.event_type,
            repo = canonical.labels.get("repo").map(String::as_str).unwrap_or(""),
            "forwarded event downstream"
        );
        Ok(DispatchOutcome::Forwarded)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("authorization", &self.authorization)
            .field("emission", &self.emission)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
