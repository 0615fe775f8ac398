//! Canonical event envelope.
//!
//! [`CanonicalEvent`] is the single shape every supported webhook delivery is
//! translated into before the emission policy runs. The wire field names match
//! what the downstream event-ingestion API expects (`type`, `shortTitle`,
//! `longTitle`, `git.commit`, `git.ref`).
//!
//! An envelope is constructed once per inbound delivery, never mutated after
//! construction, and either handed to the downstream client exactly once or
//! discarded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed source identifier stamped on every forwarded event.
pub const EVENT_SOURCE: &str = "github.com/pvandervelde/hook_relay";

/// Git coordinates attached to a canonical event.
///
/// Both fields are optional on the wire; empty strings are omitted so the
/// downstream API sees only the coordinates the source event actually carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitDetails {
    /// Commit SHA the event refers to, when known
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,

    /// Git ref the event refers to, when known
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub git_ref: String,
}

impl GitDetails {
    /// Coordinates with a commit only
    pub fn for_commit(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            git_ref: String::new(),
        }
    }

    /// Coordinates with a ref only
    pub fn for_ref(git_ref: impl Into<String>) -> Self {
        Self {
            commit: String::new(),
            git_ref: git_ref.into(),
        }
    }

    /// Coordinates with both a commit and a ref
    pub fn new(commit: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            git_ref: git_ref.into(),
        }
    }
}

/// The unit forwarded to the downstream event-ingestion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Fixed string identifying this gateway, always [`EVENT_SOURCE`]
    pub source: String,

    /// Canonical event type: `<kind>:<action>` for actioned kinds, the bare
    /// kind otherwise
    #[serde(rename = "type")]
    pub event_type: String,

    /// String labels; carries `repo` = repository full name whenever the
    /// source event had repository data
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,

    /// Git coordinates per the kind-specific mapping rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitDetails>,

    /// Short human-readable summary, only for kinds with natural titles
    #[serde(
        rename = "shortTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub short_title: Option<String>,

    /// Long human-readable summary, only for kinds with natural titles
    #[serde(rename = "longTitle", default, skip_serializing_if = "Option::is_none")]
    pub long_title: Option<String>,

    /// The original raw request body, carried opaquely.
    ///
    /// Always valid UTF-8 in practice: every translatable kind has already
    /// decoded as JSON, which rejects invalid UTF-8 at the parse stage.
    /// Should a non-UTF-8 body ever reach translation, invalid sequences are
    /// replaced rather than dropped.
    pub payload: String,
}

impl CanonicalEvent {
    /// Create an envelope with the given type and raw payload.
    ///
    /// Labels, git coordinates, and titles start empty; the translator fills
    /// them in per the kind-specific mapping rules.
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            source: EVENT_SOURCE.to_string(),
            event_type: event_type.into(),
            labels: HashMap::new(),
            git: None,
            short_title: None,
            long_title: None,
            payload: payload.into(),
        }
    }

    /// The qualifier portion of the event type: everything before the first
    /// `:`, or the whole type for non-actioned kinds.
    pub fn qualifier(&self) -> &str {
        self.event_type
            .split(':')
            .next()
            .unwrap_or(&self.event_type)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
