//! Decoding of raw webhook payloads into typed [`Event`] values.
//!
//! # Parsing Strategy
//!
//! 1. The event family comes from the `X-GitHub-Event` header
//! 2. The payload is decoded into private `Raw*` mirrors of GitHub's JSON
//! 3. Unknown event types return `Ok(None)` (dropped, not an error)
//! 4. Malformed payloads return `Err`; the delivery has already been
//!    acknowledged by then, so the caller only logs it

use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CommentId, Entity, EntityKind, EntityState, IssueNumber, RepoId};

use super::events::{
    Comment, Event, EventKind, IssueAction, IssueEvent, NoteAction, NoteEvent, PullRequestAction,
    PullRequestEvent, PushEvent, ReviewAction, ReviewEvent, ReviewState, StatusEvent, StatusState,
};

/// Error type for payload decoding failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A field decoded but holds a value we cannot use.
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Decodes a webhook payload for the given `X-GitHub-Event` value.
///
/// ```
/// use chatops_hook::webhooks::{parse_webhook, Event};
///
/// let payload = br#"{
///     "action": "created",
///     "comment": { "id": 1, "body": "/close", "user": { "login": "alice" } },
///     "issue": { "number": 3, "state": "open", "user": { "login": "alice" } },
///     "repository": { "owner": { "login": "acme" }, "name": "widgets" },
///     "sender": { "login": "alice" }
/// }"#;
///
/// let event = parse_webhook("issue_comment", payload).unwrap();
/// assert!(matches!(event, Some(Event::Note(_))));
/// assert!(parse_webhook("watch", b"{}").unwrap().is_none());
/// ```
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<Event>, ParseError> {
    let Some(kind) = EventKind::from_github_event(event_type) else {
        return Ok(None);
    };
    let event = match kind {
        EventKind::Issue => Event::Issue(parse_issues(payload)?),
        EventKind::Note => Event::Note(parse_issue_comment(payload)?),
        EventKind::PullRequest => Event::PullRequest(parse_pull_request(payload)?),
        EventKind::Review => Event::Review(parse_pull_request_review(payload)?),
        EventKind::Push => Event::Push(parse_push(payload)?),
        EventKind::Status => Event::Status(parse_status(payload)?),
    };
    Ok(Some(event))
}

// ============================================================================
// Shared raw structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawUser,
    name: String,
}

impl RawRepository {
    fn into_repo_id(self) -> RepoId {
        RepoId::new(self.owner.login, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

/// The issue-or-PR object; GitHub uses the same core shape for both.
#[derive(Debug, Deserialize)]
struct RawEntity {
    number: u64,
    state: EntityState,
    user: RawUser,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    assignees: Vec<RawUser>,
    /// Present on issues that are really pull requests.
    pull_request: Option<serde_json::Value>,
    mergeable: Option<bool>,
    milestone: Option<RawMilestone>,
}

#[derive(Debug, Deserialize)]
struct RawMilestone {
    title: String,
}

impl RawEntity {
    fn into_entity(self, kind: EntityKind) -> Entity {
        Entity {
            number: IssueNumber(self.number),
            kind,
            state: self.state,
            author: self.user.login,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            collaborators: self
                .assignees
                .into_iter()
                .map(|u| u.login)
                .collect::<BTreeSet<_>>(),
            mergeable: self.mergeable,
            milestone: self.milestone.map(|m| m.title),
        }
    }

    /// Kind for objects delivered under the `issue` key.
    fn issue_kind(&self) -> EntityKind {
        if self.pull_request.is_some() {
            EntityKind::PullRequest
        } else {
            EntityKind::Issue
        }
    }
}

// ============================================================================
// issues / issue_comment
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssuesPayload {
    action: IssueAction,
    issue: RawEntity,
    label: Option<RawLabel>,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_issues(payload: &[u8]) -> Result<IssueEvent, ParseError> {
    let raw: RawIssuesPayload = serde_json::from_slice(payload)?;
    let kind = raw.issue.issue_kind();
    Ok(IssueEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        action: raw.action,
        issue: raw.issue.into_entity(kind),
        label: raw.label.map(|l| l.name),
    })
}

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: NoteAction,
    comment: RawComment,
    issue: RawEntity,
    repository: RawRepository,
    sender: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: RawUser,
    #[serde(default)]
    html_url: String,
}

fn parse_issue_comment(payload: &[u8]) -> Result<NoteEvent, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;
    let kind = raw.issue.issue_kind();
    Ok(NoteEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        action: raw.action,
        comment: Comment {
            id: CommentId(raw.comment.id),
            author: raw.comment.user.login,
            body: raw.comment.body.unwrap_or_default(),
            html_url: raw.comment.html_url,
        },
        entity: raw.issue.into_entity(kind),
    })
}

// ============================================================================
// pull_request / pull_request_review
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    #[serde(flatten)]
    entity: RawEntity,
    head: RawRef,
    base: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    sha: String,
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: PullRequestAction,
    pull_request: RawPullRequest,
    label: Option<RawLabel>,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;
    Ok(PullRequestEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        action: raw.action,
        head_sha: raw.pull_request.head.sha,
        base_ref: raw.pull_request.base.ref_name,
        pull_request: raw.pull_request.entity.into_entity(EntityKind::PullRequest),
        label: raw.label.map(|l| l.name),
    })
}

#[derive(Debug, Deserialize)]
struct RawPullRequestReviewPayload {
    action: ReviewAction,
    review: RawReview,
    pull_request: RawEntity,
    repository: RawRepository,
    sender: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    state: ReviewState,
    body: Option<String>,
}

fn parse_pull_request_review(payload: &[u8]) -> Result<ReviewEvent, ParseError> {
    let raw: RawPullRequestReviewPayload = serde_json::from_slice(payload)?;
    Ok(ReviewEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        action: raw.action,
        state: raw.review.state,
        body: raw.review.body.unwrap_or_default(),
        pull_request: raw.pull_request.into_entity(EntityKind::PullRequest),
    })
}

// ============================================================================
// push / status
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    before: String,
    after: String,
    #[serde(default)]
    commits: Vec<serde_json::Value>,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_push(payload: &[u8]) -> Result<PushEvent, ParseError> {
    let raw: RawPushPayload = serde_json::from_slice(payload)?;
    if !raw.git_ref.starts_with("refs/") {
        return Err(ParseError::InvalidField {
            field: "ref",
            value: raw.git_ref,
        });
    }
    Ok(PushEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        git_ref: raw.git_ref,
        before: raw.before,
        after: raw.after,
        commit_count: raw.commits.len(),
    })
}

#[derive(Debug, Deserialize)]
struct RawStatusPayload {
    sha: String,
    state: String,
    context: String,
    description: Option<String>,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_status(payload: &[u8]) -> Result<StatusEvent, ParseError> {
    let raw: RawStatusPayload = serde_json::from_slice(payload)?;
    let state = match raw.state.as_str() {
        "pending" => StatusState::Pending,
        "success" => StatusState::Success,
        "failure" => StatusState::Failure,
        "error" => StatusState::Error,
        _ => {
            return Err(ParseError::InvalidField {
                field: "state",
                value: raw.state,
            });
        }
    };
    Ok(StatusEvent {
        repo: raw.repository.into_repo_id(),
        actor: raw.sender.login,
        sha: raw.sha,
        state,
        context: raw.context,
        description: raw.description,
    })
}
