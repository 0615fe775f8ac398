//! Downstream event-ingestion client.
//!
//! [`IngestClient`] is the concrete [`EventSink`]: it POSTs every accepted
//! canonical event to `<address>/v2/events` with a bearer token. Transport
//! and retry behavior beyond a single attempt belong to the ingestion API
//! itself; a failed forward surfaces as a [`SinkError`] and the upstream
//! sender decides whether to redeliver.

use async_trait::async_trait;
use hook_relay_core::{CanonicalEvent, EventSink, SinkError};
use tracing::{debug, warn};

use crate::config::DownstreamConfig;

/// Path on the ingestion API that accepts new events.
const EVENTS_PATH: &str = "/v2/events";

/// HTTP client for the downstream event-ingestion API.
pub struct IngestClient {
    http: reqwest::Client,
    address: String,
    token: String,
}

impl IngestClient {
    /// Build a client from the downstream configuration.
    ///
    /// `allow_insecure` disables certificate verification for deployments
    /// fronted by self-signed ingestion endpoints; a warning is logged when
    /// it is active.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] when the client cannot be
    /// constructed.
    pub fn new(config: &DownstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if config.allow_insecure {
            warn!("downstream certificate verification is DISABLED; do not use in production");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

impl std::fmt::Debug for IngestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestClient")
            .field("address", &self.address)
            .field("token", &"<REDACTED>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSink for IngestClient {
    /// Forward one canonical event with a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Request`] for transport failures and
    /// [`SinkError::Rejected`] for non-2xx responses.
    async fn create_event(&self, event: &CanonicalEvent) -> Result<(), SinkError> {
        let url = format!("{}{}", self.address, EVENTS_PATH);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(event)
            .send()
            .await
            .map_err(|error| SinkError::Request {
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(event_type = %event.event_type, "event accepted by ingestion API");
        Ok(())
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
