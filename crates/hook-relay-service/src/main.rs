//! # Hook-Relay Service
//!
//! Binary entry point for the webhook gateway.
//!
//! This executable:
//! - Loads configuration from environment and files
//! - Initializes logging
//! - Wires the signature verifier, policy filters, and ingestion client
//! - Starts the HTTP server from hook-relay-api

use hook_relay_api::{start_server, IngestClient, ServiceConfig, ServiceError};
use hook_relay_core::{AuthorizationFilter, Dispatcher, EmissionPolicy, SignatureVerifier};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hook_relay_service=info,hook_relay_api=info,hook_relay_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Hook-Relay Service");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/hook-relay/service.yaml           — system-wide defaults
    //  2. ./config/service.yaml                  — deployment-local override
    //  3. Path given by HOOK_RELAY_CONFIG_FILE   — operator-specified file
    //  4. Environment variables prefixed HOOK_RELAY__ (double-underscore
    //     separator), e.g. HOOK_RELAY__SERVER__PORT=9090 sets server.port
    //
    // All configuration fields carry serde defaults, so absent files produce
    // a well-formed config; validation then insists on the secrets that have
    // no sensible default.  A malformed file or an environment variable that
    // cannot be coerced to the correct type IS a hard error because it
    // indicates deliberate-but-broken operator configuration.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/hook-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("HOOK_RELAY_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("HOOK_RELAY").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let service_config: ServiceConfig = match config.try_deserialize() {
        Ok(sc) => sc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Wire the pipeline
    //
    // Everything is constructed once here and shared immutably for the life
    // of the process: the signature verifier from the webhook shared secret,
    // the authorization filter and emission policy from the webhook policy
    // section, and the ingestion client from the downstream section.
    // -------------------------------------------------------------------------
    let verifier = Arc::new(SignatureVerifier::new(
        service_config.github.shared_secret.clone(),
    ));

    let sink = match IngestClient::new(&service_config.downstream) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to construct ingestion client; aborting");
            std::process::exit(3);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(
        sink,
        AuthorizationFilter::new(service_config.webhooks.allowed_authors.clone()),
        EmissionPolicy::new(service_config.webhooks.emitted_events.clone()),
    ));

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        downstream = %service_config.downstream.address,
        "Starting HTTP server"
    );

    // Start the server
    if let Err(e) = start_server(service_config, verifier, dispatcher).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
