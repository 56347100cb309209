//! [`GitHubApi`] implementation backed by octocrab.
//!
//! Most calls go through octocrab's raw REST helpers with local response
//! structs, which keeps us independent of octocrab's model churn and lets
//! one client serve every repository the hook is installed on.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{CommentId, Entity, EntityKind, EntityState, IssueNumber, RepoId};

use super::api::{ApiResult, GitHubApi, IssueComment, MergeMethod, Permission};
use super::error::GitHubApiError;

/// Page size for list endpoints (GitHub's maximum).
const PER_PAGE: u8 = 100;

/// Upper bound on pages fetched for one listing.
const MAX_PAGES: u32 = 30;

/// Linked issues are only exposed through GraphQL.
const LINKED_ISSUES_QUERY: &str = "query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      closingIssuesReferences(first: 100) { nodes { number } }
    }
  }
}";

/// A GitHub API client usable for any repository the token can reach.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> ApiResult<T> {
        self.client
            .get(route, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)
    }

    /// Follows `?page=N` until a short page or [`MAX_PAGES`].
    async fn get_all_pages<T: DeserializeOwned>(&self, route: &str) -> ApiResult<Vec<T>> {
        #[derive(Serialize)]
        struct PageParams {
            per_page: u8,
            page: u32,
        }

        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<T> = self
                .client
                .get(
                    route,
                    Some(&PageParams {
                        per_page: PER_PAGE,
                        page,
                    }),
                )
                .await
                .map_err(GitHubApiError::from_octocrab)?;
            let is_last_page = batch.len() < PER_PAGE as usize;
            all.extend(batch);
            if is_last_page {
                return Ok(all);
            }
        }
        warn!(
            route,
            pages = MAX_PAGES,
            items = all.len(),
            "Hit pagination limit; listing may be incomplete"
        );
        Ok(all)
    }

    async fn patch_issue<B: Serialize + Sync>(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        body: &B,
    ) -> ApiResult<()> {
        let route = format!("/repos/{}/{}/issues/{}", repo.owner, repo.repo, number.0);
        let _: serde_json::Value = self
            .client
            .patch(route, Some(body))
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    number: u64,
    state: EntityState,
    user: RawUser,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    assignees: Vec<RawUser>,
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
            collaborators: self.assignees.into_iter().map(|u| u.login).collect(),
            mergeable: self.mergeable,
            milestone: self.milestone.map(|m| m.title),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawPermission {
    permission: Permission,
}

#[derive(Debug, Deserialize)]
struct LinkedIssuesResponse {
    data: LinkedIssuesData,
}

#[derive(Debug, Deserialize)]
struct LinkedIssuesData {
    repository: LinkedIssuesRepository,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedIssuesRepository {
    pull_request: LinkedIssuesPullRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedIssuesPullRequest {
    closing_issues_references: LinkedIssueNodes,
}

#[derive(Debug, Deserialize)]
struct LinkedIssueNodes {
    nodes: Vec<LinkedIssueNode>,
}

#[derive(Debug, Deserialize)]
struct LinkedIssueNode {
    number: u64,
}

impl LinkedIssuesResponse {
    fn numbers(self) -> Vec<IssueNumber> {
        self.data
            .repository
            .pull_request
            .closing_issues_references
            .nodes
            .into_iter()
            .map(|n| IssueNumber(n.number))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    merged: bool,
    message: Option<String>,
}

// ─── GitHubApi ────────────────────────────────────────────────────────────────

#[async_trait]
impl GitHubApi for OctocrabClient {
    async fn get_issue(&self, repo: &RepoId, number: IssueNumber) -> ApiResult<Entity> {
        let route = format!("/repos/{}/{}/issues/{}", repo.owner, repo.repo, number.0);
        let raw: RawEntity = self.get_json(&route).await?;
        let kind = if raw.pull_request.is_some() {
            EntityKind::PullRequest
        } else {
            EntityKind::Issue
        };
        Ok(raw.into_entity(kind))
    }

    async fn get_pull_request(&self, repo: &RepoId, number: IssueNumber) -> ApiResult<Entity> {
        let route = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number.0);
        let raw: RawEntity = self.get_json(&route).await?;
        Ok(raw.into_entity(EntityKind::PullRequest))
    }

    async fn list_repo_labels(&self, repo: &RepoId) -> ApiResult<Vec<String>> {
        let route = format!("/repos/{}/{}/labels", repo.owner, repo.repo);
        let labels: Vec<RawLabel> = self.get_all_pages(&route).await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn add_labels(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        labels: &[String],
    ) -> ApiResult<()> {
        #[derive(Serialize)]
        struct AddLabelsRequest<'a> {
            labels: &'a [String],
        }

        let route = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo.owner, repo.repo, number.0
        );
        let _: Vec<serde_json::Value> = self
            .client
            .post(route, Some(&AddLabelsRequest { labels }))
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }

    async fn remove_label(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        label: &str,
    ) -> ApiResult<()> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .remove_label(number.0, label)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }

    async fn create_comment(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        body: &str,
    ) -> ApiResult<CommentId> {
        let comment = self
            .client
            .issues(&repo.owner, &repo.repo)
            .create_comment(number.0, body)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(CommentId(comment.id.into_inner()))
    }

    async fn list_comments(
        &self,
        repo: &RepoId,
        number: IssueNumber,
    ) -> ApiResult<Vec<IssueComment>> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo.owner, repo.repo, number.0
        );
        let comments: Vec<RawComment> = self.get_all_pages(&route).await?;
        Ok(comments
            .into_iter()
            .map(|c| IssueComment {
                id: CommentId(c.id),
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_comment(&self, repo: &RepoId, id: CommentId) -> ApiResult<()> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .delete_comment(octocrab::models::CommentId(id.0))
            .await
            .map_err(GitHubApiError::from_octocrab)
    }

    async fn set_state(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        state: EntityState,
    ) -> ApiResult<()> {
        #[derive(Serialize)]
        struct StateRequest {
            state: EntityState,
        }

        self.patch_issue(repo, number, &StateRequest { state }).await
    }

    async fn list_collaborators(&self, repo: &RepoId) -> ApiResult<Vec<String>> {
        let route = format!("/repos/{}/{}/collaborators", repo.owner, repo.repo);
        let users: Vec<RawUser> = self.get_all_pages(&route).await?;
        Ok(users.into_iter().map(|u| u.login).collect())
    }

    async fn permission(&self, repo: &RepoId, login: &str) -> ApiResult<Permission> {
        let route = format!(
            "/repos/{}/{}/collaborators/{}/permission",
            repo.owner, repo.repo, login
        );
        let raw: RawPermission = self.get_json(&route).await?;
        Ok(raw.permission)
    }

    async fn set_collaborators(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        logins: &[String],
    ) -> ApiResult<()> {
        #[derive(Serialize)]
        struct AssigneesRequest<'a> {
            assignees: &'a [String],
        }

        self.patch_issue(repo, number, &AssigneesRequest { assignees: logins })
            .await
    }

    async fn list_linked_issues(
        &self,
        repo: &RepoId,
        number: IssueNumber,
    ) -> ApiResult<Vec<IssueNumber>> {
        let payload = serde_json::json!({
            "query": LINKED_ISSUES_QUERY,
            "variables": { "owner": repo.owner, "repo": repo.repo, "number": number.0 },
        });
        let response: LinkedIssuesResponse = self
            .client
            .graphql(&payload)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(response.numbers())
    }

    async fn list_changed_files(
        &self,
        repo: &RepoId,
        number: IssueNumber,
    ) -> ApiResult<Vec<String>> {
        let route = format!(
            "/repos/{}/{}/pulls/{}/files",
            repo.owner, repo.repo, number.0
        );
        let files: Vec<RawFile> = self.get_all_pages(&route).await?;
        Ok(files.into_iter().map(|f| f.filename).collect())
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        method: MergeMethod,
    ) -> ApiResult<()> {
        #[derive(Serialize)]
        struct MergeRequest {
            merge_method: &'static str,
        }

        let route = format!(
            "/repos/{}/{}/pulls/{}/merge",
            repo.owner, repo.repo, number.0
        );
        let response: MergeResponse = self
            .client
            .put(
                route,
                Some(&MergeRequest {
                    merge_method: method.as_str(),
                }),
            )
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        if response.merged {
            Ok(())
        } else {
            Err(GitHubApiError::permanent_without_source(format!(
                "merge of {} returned merged=false: {}",
                number,
                response.message.as_deref().unwrap_or("unknown reason")
            )))
        }
    }
}
