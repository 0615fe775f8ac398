use super::*;
use crate::{create_router, AppState, ServiceConfig};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use hook_relay_core::{
    AuthorizationFilter, CanonicalEvent, Dispatcher, EmissionPolicy, EventSink, SignatureVerifier,
    SinkError,
};
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "test-webhook-secret";

/// Sink that records forwarded events instead of sending them anywhere.
struct RecordingSink {
    events: Mutex<Vec<CanonicalEvent>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn forwarded(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn create_event(&self, event: &CanonicalEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn test_state(sink: Arc<RecordingSink>) -> AppState {
    AppState::new(
        ServiceConfig::default(),
        Arc::new(SignatureVerifier::new(SECRET)),
        Arc::new(Dispatcher::new(
            sink,
            AuthorizationFilter::default(),
            EmissionPolicy::default(),
        )),
    )
}

fn sha256_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

mod content_type_tests {
    use super::*;

    /// Verify unsupported content types are rejected with 400 before any
    /// signature check, even when no signature is present
    #[tokio::test]
    async fn test_unsupported_content_type_rejected_before_auth() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "text/plain")
            .header(EVENT_KIND_HEADER, "ping")
            .body(Body::from(r#"{"zen":"ok"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "{}");
        assert_eq!(sink.forwarded(), 0);
    }

    /// Verify a missing content type is treated as unsupported
    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink));

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header(EVENT_KIND_HEADER, "ping")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Verify content-type parameters do not defeat the gate
    #[tokio::test]
    async fn test_content_type_parameters_are_ignored() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));
        let body = br#"{"zen":"keep it simple"}"#;

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json; charset=utf-8")
            .header(EVENT_KIND_HEADER, "ping")
            .header(SIGNATURE_HEADER, sha256_signature(SECRET, body))
            .body(Body::from(body.as_slice()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(sink.forwarded(), 1);
    }
}

mod signature_tests {
    use super::*;

    /// Verify an unsigned delivery is rejected with 500 and never reaches
    /// the dispatcher
    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .header(EVENT_KIND_HEADER, "ping")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "{}");
        assert_eq!(sink.forwarded(), 0);
    }

    /// Verify a signature computed with the wrong secret is rejected
    #[tokio::test]
    async fn test_invalid_signature_rejected() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));
        let body = br#"{"zen":"ok"}"#;

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .header(EVENT_KIND_HEADER, "ping")
            .header(SIGNATURE_HEADER, sha256_signature("wrong-secret", body))
            .body(Body::from(body.as_slice()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.forwarded(), 0);
    }

    /// Verify a signature over different bytes than the body is rejected
    #[tokio::test]
    async fn test_tampered_body_rejected() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .header(EVENT_KIND_HEADER, "ping")
            .header(
                SIGNATURE_HEADER,
                sha256_signature(SECRET, br#"{"zen":"original"}"#),
            )
            .body(Body::from(r#"{"zen":"tampered"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.forwarded(), 0);
    }

    /// Verify a valid signature passes the delivery through with the body
    /// the handler needs intact
    #[tokio::test]
    async fn test_valid_signature_passes_body_through() {
        let sink = RecordingSink::new();
        let app = create_router(test_state(sink.clone()));
        let body = br#"{"zen":"anything added dilutes everything else"}"#;

        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .header(EVENT_KIND_HEADER, "ping")
            .header(SIGNATURE_HEADER, sha256_signature(SECRET, body))
            .body(Body::from(body.as_slice()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "{}");
        assert_eq!(sink.forwarded(), 1);
    }
}

mod media_type_tests {
    use super::*;
    use axum::http::HeaderMap;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", content_type.parse().unwrap());
        headers
    }

    /// Verify a bare media type passes through unchanged
    #[test]
    fn test_bare_media_type() {
        assert_eq!(
            media_type(&headers_with("application/json")),
            "application/json"
        );
    }

    /// Verify parameters and casing are normalized away
    #[test]
    fn test_parameters_and_case_stripped() {
        assert_eq!(
            media_type(&headers_with("Application/JSON; charset=UTF-8")),
            "application/json"
        );
    }

    /// Verify a missing header yields the empty string
    #[test]
    fn test_missing_header_is_empty() {
        assert_eq!(media_type(&HeaderMap::new()), "");
    }
}
