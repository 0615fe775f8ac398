//! Translation from typed source events to canonical events.
//!
//! One mapping rule per [`SourceEvent`] variant:
//!
//! | Kind | type | commit | ref | titles |
//! |------|------|--------|-----|--------|
//! | `check_run` | `check_run:<action>` | suite head SHA | suite head branch | — |
//! | `check_suite` | `check_suite:<action>` | head SHA | head branch | — |
//! | `commit_comment` | `commit_comment:<action>` | comment commit id | — | — |
//! | `create` | `create` | — | created ref | — |
//! | `deployment` | `deployment` | deployment SHA | deployment ref | — |
//! | `deployment_status` | `deployment_status` | deployment SHA | deployment ref | — |
//! | `ping` | `ping` | — | — | — |
//! | `pull_request` | `pull_request:<action>` | head SHA | `refs/pull/<n>/head` | PR number/title |
//! | `pull_request_review` | `pull_request_review:<action>` | head SHA | `refs/pull/<n>/head` | PR number/title |
//! | `pull_request_review_comment` | `pull_request_review_comment:<action>` | head SHA | `refs/pull/<n>/head` | PR number/title |
//! | `push` | `push` | head commit id | ref | derived from ref |
//! | `release` | `release:<action>` | — | release tag name | — |
//! | `status` | `status` | commit SHA | — | — |
//!
//! Unknown kinds are not an error; they translate to `None` and the
//! dispatcher skips them.

use crate::event::{CanonicalEvent, GitDetails};
use crate::source::{PullRequest, Repository, SourceEvent};
use regex::Regex;
use std::collections::HashMap;

const BRANCH_REF_PATTERN: &str = "refs/heads/(.+)";
const TAG_REF_PATTERN: &str = "refs/tags/(.+)";

/// Maps a parsed source event into the canonical event envelope.
///
/// Stateless apart from the two pre-compiled ref regexes used for push title
/// derivation; safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    branch_ref: Regex,
    tag_ref: Regex,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self {
            branch_ref: Regex::new(BRANCH_REF_PATTERN).expect("branch ref pattern is valid"),
            tag_ref: Regex::new(TAG_REF_PATTERN).expect("tag ref pattern is valid"),
        }
    }

    /// Translate a source event, carrying the raw payload opaquely.
    ///
    /// Returns `None` for [`SourceEvent::Unknown`] — the "unsupported kind"
    /// signal, which the dispatcher treats as a benign skip.
    pub fn translate(&self, event: &SourceEvent, payload: &[u8]) -> Option<CanonicalEvent> {
        // Known kinds decoded as JSON before reaching here, so the bytes are
        // valid UTF-8 and the lossy conversion is a verbatim copy.
        let payload_text = String::from_utf8_lossy(payload).into_owned();

        let canonical = match event {
            SourceEvent::CheckRun(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("check_run:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::new(
                    &e.check_run.check_suite.head_sha,
                    e.check_run.check_suite.head_branch.clone().unwrap_or_default(),
                ));
                canonical
            }

            SourceEvent::CheckSuite(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("check_suite:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::new(
                    &e.check_suite.head_sha,
                    e.check_suite.head_branch.clone().unwrap_or_default(),
                ));
                canonical
            }

            SourceEvent::CommitComment(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("commit_comment:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::for_commit(&e.comment.commit_id));
                canonical
            }

            SourceEvent::Create(e) => {
                let mut canonical = CanonicalEvent::new("create", payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::for_ref(&e.git_ref));
                canonical
            }

            SourceEvent::Deployment(e) => {
                let mut canonical = CanonicalEvent::new("deployment", payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::new(&e.deployment.sha, &e.deployment.git_ref));
                canonical
            }

            SourceEvent::DeploymentStatus(e) => {
                let mut canonical = CanonicalEvent::new("deployment_status", payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::new(&e.deployment.sha, &e.deployment.git_ref));
                canonical
            }

            SourceEvent::Ping(_) => CanonicalEvent::new("ping", payload_text),

            SourceEvent::PullRequest(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("pull_request:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                self.apply_pull_request(&mut canonical, &e.pull_request);
                canonical
            }

            SourceEvent::PullRequestReview(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("pull_request_review:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                self.apply_pull_request(&mut canonical, &e.pull_request);
                canonical
            }

            SourceEvent::PullRequestReviewComment(e) => {
                let mut canonical = CanonicalEvent::new(
                    format!("pull_request_review_comment:{}", e.action),
                    payload_text,
                );
                canonical.labels = repo_labels(&e.repository);
                self.apply_pull_request(&mut canonical, &e.pull_request);
                canonical
            }

            SourceEvent::Push(e) => {
                let mut canonical = CanonicalEvent::new("push", payload_text);
                canonical.labels = repo_labels(&e.repository);
                let head_commit = e
                    .head_commit
                    .as_ref()
                    .map(|commit| commit.id.clone())
                    .unwrap_or_default();
                canonical.git = Some(GitDetails::new(head_commit, &e.git_ref));
                let (short, long) = self.titles_from_ref(&e.git_ref);
                canonical.short_title = short;
                canonical.long_title = long;
                canonical
            }

            SourceEvent::Release(e) => {
                let mut canonical =
                    CanonicalEvent::new(format!("release:{}", e.action), payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::for_ref(&e.release.tag_name));
                canonical
            }

            SourceEvent::Status(e) => {
                let mut canonical = CanonicalEvent::new("status", payload_text);
                canonical.labels = repo_labels(&e.repository);
                canonical.git = Some(GitDetails::for_commit(&e.sha));
                canonical
            }

            SourceEvent::Unknown { .. } => return None,
        };

        Some(canonical)
    }

    /// Fill in the head commit, the synthetic `refs/pull/<n>/head` ref, and
    /// the PR titles shared by the three pull-request-shaped kinds.
    fn apply_pull_request(&self, canonical: &mut CanonicalEvent, pull_request: &PullRequest) {
        canonical.git = Some(GitDetails::new(
            &pull_request.head.sha,
            format!("refs/pull/{}/head", pull_request.number),
        ));
        let (short, long) = titles_from_pull_request(pull_request);
        canonical.short_title = short;
        canonical.long_title = long;
    }

    /// Derive push titles from the ref string.
    ///
    /// `refs/heads/<name>` yields `branch: <name>`, `refs/tags/<name>` yields
    /// `tag: <name>`; checked in that order. Any other ref yields no titles.
    /// Short and long titles are always identical for pushes.
    fn titles_from_ref(&self, git_ref: &str) -> (Option<String>, Option<String>) {
        if let Some(captures) = self.branch_ref.captures(git_ref) {
            let title = format!("branch: {}", &captures[1]);
            return (Some(title.clone()), Some(title));
        }
        if let Some(captures) = self.tag_ref.captures(git_ref) {
            let title = format!("tag: {}", &captures[1]);
            return (Some(title.clone()), Some(title));
        }
        (None, None)
    }
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels carried by every kind with repository data.
fn repo_labels(repository: &Repository) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert("repo".to_string(), repository.full_name.clone());
    labels
}

/// PR titles: short is `PR #<number>`, long appends `: <title>` when the
/// pull request has a title.
fn titles_from_pull_request(pull_request: &PullRequest) -> (Option<String>, Option<String>) {
    let short = format!("PR #{}", pull_request.number);
    let long = pull_request
        .title
        .as_ref()
        .map(|title| format!("{}: {}", short, title));
    (Some(short), long)
}

#[cfg(test)]
#[path = "translate_tests.rs"]
mod tests;
