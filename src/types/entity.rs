//! Issue / pull request state as seen in webhook payloads and API responses.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::IssueNumber;

/// Whether a comment thread belongs to a plain issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Issue,
    PullRequest,
}

impl EntityKind {
    /// Human-readable noun used in bot comments.
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Issue => "issue",
            EntityKind::PullRequest => "pull request",
        }
    }

    /// The noun with its indefinite article.
    pub fn with_article(self) -> &'static str {
        match self {
            EntityKind::Issue => "an issue",
            EntityKind::PullRequest => "a pull request",
        }
    }
}

/// Open/closed lifecycle state shared by issues and pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Open,
    Closed,
}

/// A snapshot of an issue or pull request.
///
/// `collaborators` are the users assigned to the entity; `mergeable` is only
/// meaningful for pull requests and is `None` while GitHub is still computing it.
/// `milestone` is the milestone title, if one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub number: IssueNumber,
    pub kind: EntityKind,
    pub state: EntityState,
    pub author: String,
    pub labels: BTreeSet<String>,
    pub collaborators: BTreeSet<String>,
    pub mergeable: Option<bool>,
    pub milestone: Option<String>,
}

impl Entity {
    pub fn is_open(&self) -> bool {
        self.state == EntityState::Open
    }

    pub fn is_pull_request(&self) -> bool {
        self.kind == EntityKind::PullRequest
    }

    /// Case-insensitive label membership.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}
