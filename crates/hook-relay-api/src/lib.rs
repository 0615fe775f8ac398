//! # Hook-Relay HTTP Service
//!
//! HTTP surface of the gateway. A single webhook endpoint accepts GitHub
//! deliveries, a signature-verification middleware authenticates them before
//! any handler runs, and the handler funnels the payload through the core
//! dispatcher toward the downstream event-ingestion API.
//!
//! This crate provides:
//! - `POST /events` webhook endpoint with HMAC signature validation
//! - Health check endpoint
//! - Immutable service configuration loaded at startup
//! - The [`IngestClient`] that forwards canonical events downstream

pub mod auth;
pub mod config;
pub mod errors;
pub mod ingest;

pub use config::{
    ConfigError, DownstreamConfig, GithubConfig, LoggingConfig, ServerConfig, ServiceConfig,
    WebhookPolicyConfig,
};
pub use errors::GatewayError;
pub use ingest::IngestClient;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use hook_relay_core::{DispatchOutcome, Dispatcher, SignatureVerifier, SourceEvent};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::auth::{CONTENT_TYPE_FORM, DELIVERY_ID_HEADER, EVENT_KIND_HEADER};
use crate::errors::empty_object_response;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
///
/// Assembled once at startup and cloned into every handler; nothing in it is
/// mutated after construction.
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Verifier for webhook delivery signatures
    pub verifier: Arc<SignatureVerifier>,

    /// Dispatcher that authorizes, translates, and forwards events
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        verifier: Arc<SignatureVerifier>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            config,
            verifier,
            dispatcher,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
///
/// Signature verification runs as a middleware layer on the webhook routes
/// only; health checks are reachable without a signature.
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route("/events", post(handle_events))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::verify_webhook,
        ));

    let health_routes = Router::new().route("/health", get(handle_health_check));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Binds the configured address and serves until SIGINT or SIGTERM, allowing
/// in-flight deliveries to complete before shutdown.
pub async fn start_server(
    config: ServiceConfig,
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), ServiceError> {
    if config.server.tls_cert_path.is_some() || config.server.tls_key_path.is_some() {
        // TLS termination is delegated to the fronting proxy; the paths are
        // accepted so deployments can keep a single config file.
        warn!("TLS certificate paths are configured but termination is handled upstream");
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::new(config, verifier, dispatcher);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle authenticated webhook deliveries
///
/// The signature middleware has already verified the delivery by the time
/// this runs. The handler extracts the event kind and payload, asks the
/// dispatcher to authorize and translate it, and always answers with an
/// empty JSON object; the status code alone distinguishes outcomes. Skipped
/// deliveries are a success from the sender's point of view.
#[instrument(skip(state, headers, body), fields(event_kind))]
pub async fn handle_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let kind = headers
        .get(EVENT_KIND_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if kind.is_empty() {
        return Err(GatewayError::Parse(
            hook_relay_core::ParseError::MissingKind,
        ));
    }
    tracing::Span::current().record("event_kind", kind.as_str());

    let payload = extract_payload(&headers, &body)?;
    let event = SourceEvent::parse(&kind, &payload)?;

    let outcome = state.dispatcher.handle(&event, &payload).await?;
    match outcome {
        DispatchOutcome::Forwarded => {
            info!(event_kind = %kind, "delivery forwarded downstream");
        }
        DispatchOutcome::Skipped(reason) => {
            info!(event_kind = %kind, reason = reason.as_str(), "delivery skipped");
        }
    }

    Ok(empty_object_response(StatusCode::OK))
}

/// Extract the webhook payload from the request body.
///
/// JSON deliveries carry the payload as the whole body; form-encoded
/// deliveries wrap it in a `payload` field. The middleware has already
/// rejected every other content type.
fn extract_payload(headers: &HeaderMap, body: &Bytes) -> Result<Vec<u8>, GatewayError> {
    if auth::media_type(headers) == CONTENT_TYPE_FORM {
        return url::form_urlencoded::parse(body)
            .find(|(name, _)| name == "payload")
            .map(|(_, value)| value.into_owned().into_bytes())
            .ok_or_else(|| GatewayError::UnreadableBody {
                message: "form body has no payload field".to_string(),
            });
    }

    Ok(body.to_vec())
}

// ============================================================================
// Health Check Handler
// ============================================================================

/// Basic health check endpoint
#[instrument(skip_all)]
async fn handle_health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware keyed on the delivery identifier
///
/// GitHub stamps every delivery with a unique `X-GitHub-Delivery` header,
/// which doubles as our correlation ID. Requests without one (health probes)
/// are logged without it.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    delivery_id
))]
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let delivery_id = request
        .headers()
        .get(DELIVERY_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !delivery_id.is_empty() {
        tracing::Span::current().record("delivery_id", delivery_id.as_str());
    }

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            delivery_id = %delivery_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            delivery_id = %delivery_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            delivery_id = %delivery_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
