//! Authorization filter and emission policy.
//!
//! [`AuthorizationFilter`] decides whether a pull-request-shaped event may be
//! processed at all; [`EmissionPolicy`] decides, after translation, whether a
//! canonical event type is forwarded downstream. Both are built once from
//! startup configuration and read concurrently by every request handler.

use crate::dispatch::SkipReason;
use crate::source::PullRequestEvent;
use tracing::info;

/// Author associations allowed to trigger processing from fork pull requests
/// when no explicit allow-list is configured.
pub const DEFAULT_ALLOWED_AUTHORS: [&str; 3] = ["COLLABORATOR", "OWNER", "MEMBER"];

/// Pull-request actions this gateway processes; anything else is skipped.
const ALLOWED_PULL_REQUEST_ACTIONS: [&str; 6] = [
    "opened",
    "synchronize",
    "reopened",
    "labeled",
    "unlabeled",
    "closed",
];

// ============================================================================
// AuthorizationFilter
// ============================================================================

/// Fork/author gate for pull-request-shaped events.
///
/// A pull request whose head repository is a fork is processed only when the
/// author's association with the base repository is in the allow-list. Pull
/// requests against the origin repository bypass the association check
/// entirely. Separately, the action must be one of the supported set.
///
/// Both rejections are benign skips, not errors.
#[derive(Debug, Clone)]
pub struct AuthorizationFilter {
    allowed_authors: Vec<String>,
}

impl AuthorizationFilter {
    /// Construct a filter with an explicit author-association allow-list.
    pub fn new(allowed_authors: Vec<String>) -> Self {
        Self { allowed_authors }
    }

    /// Evaluate a pull-request event, returning the skip reason when the
    /// event must not be processed.
    pub fn evaluate(&self, event: &PullRequestEvent) -> Option<SkipReason> {
        // A missing head repo means the fork was deleted; without fork
        // evidence the origin-repository fast path applies.
        let is_fork = event
            .pull_request
            .head
            .repo
            .as_ref()
            .map(|repo| repo.fork)
            .unwrap_or(false);

        let association = &event.pull_request.author_association;
        if is_fork && !self.is_allowed_author(association) {
            info!(
                author_association = %association,
                "skipping pull request from disallowed author"
            );
            return Some(SkipReason::DisallowedAuthor);
        }

        if !ALLOWED_PULL_REQUEST_ACTIONS.contains(&event.action.as_str()) {
            info!(action = %event.action, "unsupported pull_request action");
            return Some(SkipReason::UnsupportedAction);
        }

        None
    }

    fn is_allowed_author(&self, association: &str) -> bool {
        self.allowed_authors
            .iter()
            .any(|allowed| allowed == association)
    }
}

impl Default for AuthorizationFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_AUTHORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

// ============================================================================
// EmissionPolicy
// ============================================================================

/// Allow-list gate over canonical event types.
///
/// Patterns are evaluated in order against the fully qualified type string;
/// any match forwards:
///
/// 1. exact match of the full type (`pull_request:opened`),
/// 2. match of the qualifier — the substring before the first `:`
///    (`pull_request`),
/// 3. the literal wildcard `*`.
///
/// The policy runs after translation, so it always sees the qualified
/// `kind:action` form for actioned kinds.
#[derive(Debug, Clone)]
pub struct EmissionPolicy {
    patterns: Vec<String>,
}

impl EmissionPolicy {
    /// Construct a policy with an explicit pattern list.
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Decide whether a canonical event type should be forwarded.
    pub fn should_emit(&self, event_type: &str) -> bool {
        let qualifier = event_type.split(':').next().unwrap_or(event_type);
        self.patterns
            .iter()
            .any(|pattern| pattern == event_type || pattern == qualifier || pattern == "*")
    }
}

impl Default for EmissionPolicy {
    /// Forward everything.
    fn default() -> Self {
        Self::new(vec!["*".to_string()])
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
