//! Typed representations of the webhook events plugins can subscribe to.
//!
//! # Event Types
//!
//! | [`EventKind`] | `X-GitHub-Event`      |
//! |---------------|-----------------------|
//! | `Issue`       | `issues`              |
//! | `Note`        | `issue_comment`       |
//! | `PullRequest` | `pull_request`        |
//! | `Review`      | `pull_request_review` |
//! | `Push`        | `push`                |
//! | `Status`      | `status`              |
//!
//! Every variant carries the repository and the acting user. Actions a plugin
//! does not care about are still decoded (as `Other` where GitHub adds new
//! ones); filtering is the plugin's business.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, Entity, EntityKind, RepoId};

/// The six event families the router knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Issue,
    Note,
    PullRequest,
    Review,
    Push,
    Status,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Issue,
        EventKind::Note,
        EventKind::PullRequest,
        EventKind::Review,
        EventKind::Push,
        EventKind::Status,
    ];

    /// The `X-GitHub-Event` header value for this kind.
    pub fn github_event(self) -> &'static str {
        match self {
            EventKind::Issue => "issues",
            EventKind::Note => "issue_comment",
            EventKind::PullRequest => "pull_request",
            EventKind::Review => "pull_request_review",
            EventKind::Push => "push",
            EventKind::Status => "status",
        }
    }

    /// Maps an `X-GitHub-Event` header value back to a kind.
    pub fn from_github_event(event_type: &str) -> Option<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.github_event() == event_type)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.github_event())
    }
}

/// A decoded webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Issue(IssueEvent),
    Note(NoteEvent),
    PullRequest(PullRequestEvent),
    Review(ReviewEvent),
    Push(PushEvent),
    Status(StatusEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Issue(_) => EventKind::Issue,
            Event::Note(_) => EventKind::Note,
            Event::PullRequest(_) => EventKind::PullRequest,
            Event::Review(_) => EventKind::Review,
            Event::Push(_) => EventKind::Push,
            Event::Status(_) => EventKind::Status,
        }
    }

    /// Returns the repository this event belongs to.
    pub fn repo(&self) -> &RepoId {
        match self {
            Event::Issue(e) => &e.repo,
            Event::Note(e) => &e.repo,
            Event::PullRequest(e) => &e.repo,
            Event::Review(e) => &e.repo,
            Event::Push(e) => &e.repo,
            Event::Status(e) => &e.repo,
        }
    }

    /// Login of the user whose action triggered the delivery.
    pub fn actor(&self) -> &str {
        match self {
            Event::Issue(e) => &e.actor,
            Event::Note(e) => &e.actor,
            Event::PullRequest(e) => &e.actor,
            Event::Review(e) => &e.actor,
            Event::Push(e) => &e.actor,
            Event::Status(e) => &e.actor,
        }
    }

    /// The issue or pull request the event targets, if any.
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Event::Issue(e) => Some(&e.issue),
            Event::Note(e) => Some(&e.entity),
            Event::PullRequest(e) => Some(&e.pull_request),
            Event::Review(e) => Some(&e.pull_request),
            Event::Push(_) | Event::Status(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    Opened,
    Edited,
    Closed,
    Reopened,
    Labeled,
    Unlabeled,
    Assigned,
    Unassigned,
    Milestoned,
    Demilestoned,
    #[serde(other)]
    Other,
}

/// An `issues` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    pub repo: RepoId,
    pub actor: String,
    pub action: IssueAction,
    pub issue: Entity,
    /// The label added or removed, for `labeled`/`unlabeled`.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAction {
    Created,
    Edited,
    Deleted,
    #[serde(other)]
    Other,
}

/// A comment as delivered in an `issue_comment` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub author: String,
    /// Raw comment text; empty for deletions.
    pub body: String,
    pub html_url: String,
}

/// An `issue_comment` delivery.
///
/// GitHub delivers conversation comments on pull requests as issue comments;
/// [`NoteEvent::noteable_kind`] tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub repo: RepoId,
    pub actor: String,
    pub action: NoteAction,
    pub comment: Comment,
    pub entity: Entity,
}

impl NoteEvent {
    pub fn noteable_kind(&self) -> EntityKind {
        self.entity.kind
    }

    /// Only freshly created comments carry commands.
    pub fn is_new_comment(&self) -> bool {
        self.action == NoteAction::Created
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Edited,
    Closed,
    Reopened,
    Synchronize,
    Labeled,
    Unlabeled,
    Assigned,
    Unassigned,
    ReadyForReview,
    #[serde(other)]
    Other,
}

/// A `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub repo: RepoId,
    pub actor: String,
    pub action: PullRequestAction,
    pub pull_request: Entity,
    pub head_sha: String,
    pub base_ref: String,
    /// The label added or removed, for `labeled`/`unlabeled`.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submitted,
    Edited,
    Dismissed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    #[serde(other)]
    Other,
}

/// A `pull_request_review` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEvent {
    pub repo: RepoId,
    pub actor: String,
    pub action: ReviewAction,
    pub state: ReviewState,
    pub body: String,
    pub pull_request: Entity,
}

/// A `push` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub repo: RepoId,
    pub actor: String,
    /// Full ref name, e.g. `refs/heads/main`.
    pub git_ref: String,
    pub before: String,
    pub after: String,
    pub commit_count: usize,
}

impl PushEvent {
    /// Branch name when the push targets `refs/heads/*`.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

/// A `status` delivery (legacy commit status API).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub repo: RepoId,
    pub actor: String,
    pub sha: String,
    pub state: StatusState,
    pub context: String,
    pub description: Option<String>,
}
