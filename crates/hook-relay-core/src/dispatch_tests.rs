//! Tests for the dispatch pipeline.
//!
//! Uses an in-memory recording sink to observe exactly what reaches the
//! downstream seam.

use super::*;
use crate::policy::{AuthorizationFilter, EmissionPolicy};
use crate::source::SourceEvent;
use std::sync::Mutex;

// ============================================================================
// Helpers
// ============================================================================

/// Records every forwarded event; optionally fails every forward.
#[derive(Default)]
struct RecordingSink {
    forwarded: Mutex<Vec<CanonicalEvent>>,
    fail: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            forwarded: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn forwarded(&self) -> Vec<CanonicalEvent> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn create_event(&self, event: &CanonicalEvent) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Rejected {
                status: 500,
                message: "ingestion unavailable".to_string(),
            });
        }
        self.forwarded.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn dispatcher_with(sink: Arc<RecordingSink>, emitted: Vec<&str>) -> Dispatcher {
    Dispatcher::new(
        sink,
        AuthorizationFilter::default(),
        EmissionPolicy::new(emitted.into_iter().map(String::from).collect()),
    )
}

async fn handle(dispatcher: &Dispatcher, kind: &str, payload: &[u8]) -> DispatchOutcome {
    let event = SourceEvent::parse(kind, payload).unwrap();
    dispatcher.handle(&event, payload).await.unwrap()
}

// ============================================================================
// Gate-order tests
// ============================================================================

mod gate_tests {
    use super::*;

    /// Fork PR from an author outside the allow-list: benign skip, nothing
    /// reaches the sink.
    #[tokio::test]
    async fn test_fork_pull_request_from_disallowed_author_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        let payload = br#"{
            "action": "opened",
            "pull_request": {
                "number": 3,
                "author_association": "NONE",
                "head": {"sha": "abc", "repo": {"fork": true}}
            },
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "pull_request", payload).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Skipped(SkipReason::DisallowedAuthor)
        );
        assert!(sink.forwarded().is_empty());
    }

    /// Non-fork PRs forward regardless of association.
    #[tokio::test]
    async fn test_origin_pull_request_forwards_despite_association() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        let payload = br#"{
            "action": "opened",
            "pull_request": {
                "number": 3,
                "author_association": "NONE",
                "head": {"sha": "abc", "repo": {"fork": false}}
            },
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "pull_request", payload).await;
        assert_eq!(outcome, DispatchOutcome::Forwarded);
        assert_eq!(sink.forwarded().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_pull_request_action_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        let payload = br#"{
            "action": "assigned",
            "pull_request": {
                "number": 3,
                "author_association": "OWNER",
                "head": {"sha": "abc", "repo": {"fork": false}}
            },
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "pull_request", payload).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Skipped(SkipReason::UnsupportedAction)
        );
        assert!(sink.forwarded().is_empty());
    }

    /// Deleted refs never trigger a build, whatever the ref content.
    #[tokio::test]
    async fn test_push_with_deleted_flag_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        for git_ref in ["refs/heads/main", "refs/tags/v1.0.0", "weird-ref"] {
            let payload = format!(
                r#"{{"ref": "{}", "deleted": true, "repository": {{"full_name": "o/r"}}}}"#,
                git_ref
            );
            let outcome = handle(&dispatcher, "push", payload.as_bytes()).await;
            assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::RefDeleted));
        }
        assert!(sink.forwarded().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_skipped_without_error() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        let outcome = handle(&dispatcher, "workflow_dispatch", b"{}").await;
        assert_eq!(
            outcome,
            DispatchOutcome::Skipped(SkipReason::UnsupportedKind)
        );
        assert!(sink.forwarded().is_empty());
    }

    /// The emission policy is the last gate: a translated event it rejects
    /// is dropped after translation, before the sink.
    #[tokio::test]
    async fn test_emission_policy_rejection_skips_forward() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["push"]);

        let payload = br#"{
            "action": "published",
            "release": {"tag_name": "v1.0.0"},
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "release", payload).await;
        assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::NotEmitted));
        assert!(sink.forwarded().is_empty());
    }
}

// ============================================================================
// Forwarding tests
// ============================================================================

mod forward_tests {
    use super::*;

    /// A completed check run forwards with the qualified type and repo label.
    #[tokio::test]
    async fn test_check_run_forwards_with_expected_envelope() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["check_run"]);

        let payload = br#"{
            "action": "completed",
            "check_run": {"check_suite": {"head_sha": "aaa", "head_branch": "main"}},
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "check_run", payload).await;
        assert_eq!(outcome, DispatchOutcome::Forwarded);

        let forwarded = sink.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].event_type, "check_run:completed");
        assert_eq!(forwarded[0].labels.get("repo").unwrap(), "org/repo");
    }

    #[tokio::test]
    async fn test_branch_push_forwards_with_titles() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone(), vec!["*"]);

        let payload = br#"{
            "ref": "refs/heads/main",
            "deleted": false,
            "head_commit": {"id": "123"},
            "repository": {"full_name": "org/repo"}
        }"#;

        let outcome = handle(&dispatcher, "push", payload).await;
        assert_eq!(outcome, DispatchOutcome::Forwarded);

        let forwarded = sink.forwarded();
        assert_eq!(forwarded[0].event_type, "push");
        assert_eq!(forwarded[0].short_title.as_deref(), Some("branch: main"));
        assert_eq!(forwarded[0].long_title.as_deref(), Some("branch: main"));
    }

    /// Downstream failures are the only hard error the dispatcher produces.
    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let sink = Arc::new(RecordingSink::failing());
        let dispatcher = dispatcher_with(sink, vec!["*"]);

        let payload = br#"{"repository": {"full_name": "org/repo"}, "ref": "refs/heads/m"}"#;
        let event = SourceEvent::parse("push", payload).unwrap();

        let result = dispatcher.handle(&event, payload).await;
        assert!(matches!(result, Err(DispatchError::Forward(_))));
    }

    /// A skip never consults the sink, even a failing one.
    #[tokio::test]
    async fn test_skip_never_touches_sink() {
        let sink = Arc::new(RecordingSink::failing());
        let dispatcher = dispatcher_with(sink, vec!["*"]);

        let event = SourceEvent::parse("workflow_dispatch", b"{}").unwrap();
        let result = dispatcher.handle(&event, b"{}").await;
        assert!(matches!(
            result,
            Ok(DispatchOutcome::Skipped(SkipReason::UnsupportedKind))
        ));
    }
}
