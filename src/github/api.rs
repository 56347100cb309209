//! The subset of the GitHub REST API the plugins use.
//!
//! Plugins only ever talk to GitHub through [`GitHubApi`], so tests can swap
//! in a recording fake and production uses [`OctocrabClient`](super::OctocrabClient).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{CommentId, Entity, EntityState, IssueNumber, RepoId};

use super::error::GitHubApiError;

pub type ApiResult<T> = Result<T, GitHubApiError>;

/// A user's effective permission on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    #[serde(other)]
    None,
}

impl Permission {
    /// Admin, maintain and write may act on other people's issues.
    pub fn is_elevated(self) -> bool {
        matches!(
            self,
            Permission::Admin | Permission::Maintain | Permission::Write
        )
    }
}

/// How a pull request is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
}

impl MergeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
        }
    }
}

/// A comment on an issue or pull request conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: CommentId,
    pub author: String,
    pub body: String,
}

/// Remote operations available to plugins.
///
/// Every method is a single REST call (or a paginated series of them); none
/// of them retry.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fetches an issue, or a pull request through the issues endpoint
    /// (`mergeable` is then unknown).
    async fn get_issue(&self, repo: &RepoId, number: IssueNumber) -> ApiResult<Entity>;

    /// Fetches a pull request including its `mergeable` flag.
    async fn get_pull_request(&self, repo: &RepoId, number: IssueNumber) -> ApiResult<Entity>;

    async fn list_repo_labels(&self, repo: &RepoId) -> ApiResult<Vec<String>>;

    async fn add_labels(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        labels: &[String],
    ) -> ApiResult<()>;

    async fn remove_label(&self, repo: &RepoId, number: IssueNumber, label: &str)
    -> ApiResult<()>;

    async fn create_comment(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        body: &str,
    ) -> ApiResult<CommentId>;

    async fn list_comments(&self, repo: &RepoId, number: IssueNumber)
    -> ApiResult<Vec<IssueComment>>;

    async fn delete_comment(&self, repo: &RepoId, id: CommentId) -> ApiResult<()>;

    /// Opens or closes an issue or pull request.
    async fn set_state(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        state: EntityState,
    ) -> ApiResult<()>;

    /// Logins of everyone with access to the repository.
    async fn list_collaborators(&self, repo: &RepoId) -> ApiResult<Vec<String>>;

    async fn permission(&self, repo: &RepoId, login: &str) -> ApiResult<Permission>;

    /// Replaces the entity's collaborators (assignees) with `logins`.
    async fn set_collaborators(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        logins: &[String],
    ) -> ApiResult<()>;

    /// Issues a pull request will close when merged (its linked issues).
    async fn list_linked_issues(&self, repo: &RepoId, number: IssueNumber)
    -> ApiResult<Vec<IssueNumber>>;

    /// Paths of the files a pull request changes.
    async fn list_changed_files(&self, repo: &RepoId, number: IssueNumber)
    -> ApiResult<Vec<String>>;

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        method: MergeMethod,
    ) -> ApiResult<()>;
}
