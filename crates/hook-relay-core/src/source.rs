//! Typed source events.
//!
//! [`SourceEvent`] is a closed sum type with one variant per webhook kind this
//! gateway understands, plus [`SourceEvent::Unknown`] for everything else.
//! Dispatch over event kinds is always a `match` on this enum; there is no
//! open-ended dynamic dispatch anywhere in the pipeline.
//!
//! The payload structs decode only the routing fields the pipeline needs.
//! Every field carries a serde default so that schema drift in fields we do
//! not route on never fails a delivery; only structurally malformed JSON of a
//! known kind is a hard error.

use crate::ParseError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

// ============================================================================
// Shared payload fragments
// ============================================================================

/// Repository data common to most webhook payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    /// Fully qualified name, e.g. `org/repo`
    #[serde(default)]
    pub full_name: String,
}

/// Check suite data carried by `check_run` and `check_suite` payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckSuite {
    #[serde(default)]
    pub head_sha: String,

    /// Head branch; null for suites triggered from forks
    #[serde(default)]
    pub head_branch: Option<String>,
}

/// Deployment data shared by `deployment` and `deployment_status` payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub sha: String,

    #[serde(rename = "ref", default)]
    pub git_ref: String,
}

/// Head repository of a pull request; `fork` discriminates fork PRs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadRepository {
    #[serde(default)]
    pub fork: bool,
}

/// Head coordinates of a pull request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestHead {
    #[serde(default)]
    pub sha: String,

    /// Absent when the head repository has been deleted
    #[serde(default)]
    pub repo: Option<HeadRepository>,
}

/// Pull request data shared by the three pull-request-shaped kinds
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: u64,

    #[serde(default)]
    pub title: Option<String>,

    /// Relationship of the author to the base repository, e.g. `OWNER`
    #[serde(default)]
    pub author_association: String,

    #[serde(default)]
    pub head: PullRequestHead,
}

// ============================================================================
// Per-kind payloads
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub check_run: CheckRunPayload,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunPayload {
    #[serde(default)]
    pub check_suite: CheckSuite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckSuiteEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub check_suite: CheckSuite,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitCommentEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub comment: CommitComment,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitComment {
    #[serde(default)]
    pub commit_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEvent {
    /// The created ref; may name a branch or a tag
    #[serde(rename = "ref", default)]
    pub git_ref: String,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentEvent {
    #[serde(default)]
    pub deployment: Deployment,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentStatusEvent {
    #[serde(default)]
    pub deployment: Deployment,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub pull_request: PullRequest,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestReviewEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub pull_request: PullRequest,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub pull_request: PullRequest,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: String,

    /// Set when the push deleted the ref; deleted refs never trigger a build
    #[serde(default)]
    pub deleted: bool,

    /// Absent for pushes with no commits (e.g. ref deletions)
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseEvent {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub release: Release,

    #[serde(default)]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEvent {
    #[serde(default)]
    pub sha: String,

    #[serde(default)]
    pub repository: Repository,
}

// ============================================================================
// SourceEvent
// ============================================================================

/// A webhook delivery decoded into one of the supported kinds.
///
/// Kinds outside the supported set decode to [`SourceEvent::Unknown`], which
/// is a benign outcome — the dispatcher skips it without error. Only a payload
/// of a known kind that fails to decode is a [`ParseError`].
#[derive(Debug, Clone)]
pub enum SourceEvent {
    CheckRun(CheckRunEvent),
    CheckSuite(CheckSuiteEvent),
    CommitComment(CommitCommentEvent),
    Create(CreateEvent),
    Deployment(DeploymentEvent),
    DeploymentStatus(DeploymentStatusEvent),
    Ping(PingEvent),
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestReviewEvent),
    PullRequestReviewComment(PullRequestReviewCommentEvent),
    Push(PushEvent),
    Release(ReleaseEvent),
    Status(StatusEvent),
    Unknown { kind: String },
}

impl SourceEvent {
    /// Decode a raw payload into a typed source event.
    ///
    /// `kind` is the value of the `X-GitHub-Event` header.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedPayload`] when the payload of a known
    /// kind is not structurally valid JSON for that kind. An unrecognized
    /// kind is not an error; it decodes to [`SourceEvent::Unknown`].
    pub fn parse(kind: &str, payload: &[u8]) -> Result<Self, ParseError> {
        let event = match kind {
            "check_run" => Self::CheckRun(decode(kind, payload)?),
            "check_suite" => Self::CheckSuite(decode(kind, payload)?),
            "commit_comment" => Self::CommitComment(decode(kind, payload)?),
            "create" => Self::Create(decode(kind, payload)?),
            "deployment" => Self::Deployment(decode(kind, payload)?),
            "deployment_status" => Self::DeploymentStatus(decode(kind, payload)?),
            "ping" => Self::Ping(decode(kind, payload)?),
            "pull_request" => Self::PullRequest(decode(kind, payload)?),
            "pull_request_review" => Self::PullRequestReview(decode(kind, payload)?),
            "pull_request_review_comment" => {
                Self::PullRequestReviewComment(decode(kind, payload)?)
            }
            "push" => Self::Push(decode(kind, payload)?),
            "release" => Self::Release(decode(kind, payload)?),
            "status" => Self::Status(decode(kind, payload)?),
            other => Self::Unknown {
                kind: other.to_string(),
            },
        };

        Ok(event)
    }

    /// The kind string this event was parsed from.
    pub fn kind(&self) -> &str {
        match self {
            Self::CheckRun(_) => "check_run",
            Self::CheckSuite(_) => "check_suite",
            Self::CommitComment(_) => "commit_comment",
            Self::Create(_) => "create",
            Self::Deployment(_) => "deployment",
            Self::DeploymentStatus(_) => "deployment_status",
            Self::Ping(_) => "ping",
            Self::PullRequest(_) => "pull_request",
            Self::PullRequestReview(_) => "pull_request_review",
            Self::PullRequestReviewComment(_) => "pull_request_review_comment",
            Self::Push(_) => "push",
            Self::Release(_) => "release",
            Self::Status(_) => "status",
            Self::Unknown { kind } => kind,
        }
    }
}

/// Decode a payload into the typed struct for `kind`, keeping the kind in the
/// error for logging context.
fn decode<T: DeserializeOwned>(kind: &str, payload: &[u8]) -> Result<T, ParseError> {
    serde_json::from_slice(payload).map_err(|source| ParseError::MalformedPayload {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
