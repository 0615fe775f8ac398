//! Configuration types for the gateway service.
//!
//! Loaded once at startup (see `hook-relay-service`), validated, then shared
//! read-only by every request handler. Every field carries a serde default so
//! an unconfigured environment deserializes cleanly; `validate()` then
//! insists on the values that have no sensible default (downstream address
//! and token, webhook shared secret).

use hook_relay_core::policy::DEFAULT_ALLOWED_AUTHORS;
use serde::{Deserialize, Serialize};

/// Error type for invalid service configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {field}")]
    MissingValue { field: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Downstream event-ingestion API settings
    pub downstream: DownstreamConfig,

    /// GitHub App identity and webhook secret
    pub github: GithubConfig,

    /// Authorization and emission policy
    pub webhooks: WebhookPolicyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the assembled configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required value is absent or when the
    /// TLS paths are not supplied as a pair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.downstream.address.is_empty() {
            return Err(ConfigError::MissingValue {
                field: "downstream.address".to_string(),
            });
        }
        if self.downstream.token.is_empty() {
            return Err(ConfigError::MissingValue {
                field: "downstream.token".to_string(),
            });
        }
        if self.github.shared_secret.is_empty() {
            return Err(ConfigError::MissingValue {
                field: "github.shared_secret".to_string(),
            });
        }
        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(ConfigError::Invalid {
                message: "server.tls_cert_path and server.tls_key_path must be set together"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// TLS certificate path for the fronting terminator (optional)
    pub tls_cert_path: Option<String>,

    /// TLS key path for the fronting terminator (optional)
    pub tls_key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 10 * 1024 * 1024, // 10MB
            shutdown_timeout_seconds: 30,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

/// Downstream event-ingestion API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base address of the ingestion API, e.g. `https://events.internal:8443`
    pub address: String,

    /// Bearer token presented on every forward
    pub token: String,

    /// Accept invalid downstream certificates (dev/test only)
    pub allow_insecure: bool,
}

/// GitHub App identity and webhook shared secret
///
/// The app id is carried for deployment parity but is not an authentication
/// condition; signature validity is the sole enforced check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// GitHub App identifier
    pub app_id: String,

    /// Shared secret used to sign webhook deliveries
    pub shared_secret: String,
}

/// Authorization and emission policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookPolicyConfig {
    /// Author associations allowed to trigger processing from fork PRs
    pub allowed_authors: Vec<String>,

    /// Canonical event type patterns to forward downstream
    pub emitted_events: Vec<String>,
}

impl Default for WebhookPolicyConfig {
    fn default() -> Self {
        Self {
            allowed_authors: DEFAULT_ALLOWED_AUTHORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            emitted_events: vec!["*".to_string()], // Forward everything
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
