//! Shared test utilities: a recording GitHub fake, stub plugins, event
//! builders and arbitrary generators for property-based testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

use crate::github::{ApiResult, GitHubApi, GitHubApiError, IssueComment, MergeMethod, Permission};
use crate::plugins::{Plugin, PluginContext, PluginError, PluginHelp};
use crate::types::{
    CommentId, DeliveryId, Entity, EntityKind, EntityState, IssueNumber, RepoId,
};
use crate::webhooks::{
    Comment, Event, EventKind, IssueAction, IssueEvent, NoteAction, NoteEvent, PullRequestAction,
    PullRequestEvent,
};

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_login() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,12}".prop_map(String::from)
}

pub fn arb_repo_id() -> impl Strategy<Value = RepoId> {
    ("[a-z][a-z0-9-]{0,8}", "[a-z][a-z0-9._-]{0,8}").prop_map(|(o, r)| RepoId::new(o, r))
}

// ─── Builders ─────────────────────────────────────────────────────────────────

pub fn repo() -> RepoId {
    RepoId::new("acme", "widgets")
}

pub fn entity(number: u64, kind: EntityKind, author: &str) -> Entity {
    Entity {
        number: IssueNumber(number),
        kind,
        state: EntityState::Open,
        author: author.to_string(),
        labels: BTreeSet::new(),
        collaborators: BTreeSet::new(),
        mergeable: None,
        milestone: None,
    }
}

pub fn issue(number: u64, author: &str) -> Entity {
    entity(number, EntityKind::Issue, author)
}

pub fn pull_request(number: u64, author: &str) -> Entity {
    Entity {
        mergeable: Some(true),
        ..entity(number, EntityKind::PullRequest, author)
    }
}

/// A newly created comment by `actor` on `entity`.
pub fn note(entity: &Entity, actor: &str, body: &str) -> Event {
    Event::Note(NoteEvent {
        repo: repo(),
        actor: actor.to_string(),
        action: NoteAction::Created,
        comment: Comment {
            id: CommentId(900),
            author: actor.to_string(),
            body: body.to_string(),
            html_url: format!(
                "https://github.com/acme/widgets/issues/{}#issuecomment-900",
                entity.number.0
            ),
        },
        entity: entity.clone(),
    })
}

pub fn pr_event(action: PullRequestAction, pr: &Entity, actor: &str) -> Event {
    Event::PullRequest(PullRequestEvent {
        repo: repo(),
        actor: actor.to_string(),
        action,
        pull_request: pr.clone(),
        head_sha: "0123456789abcdef0123456789abcdef01234567".to_string(),
        base_ref: "main".to_string(),
        label: None,
    })
}

pub fn issue_event(action: IssueAction, issue: &Entity, actor: &str) -> Event {
    Event::Issue(IssueEvent {
        repo: repo(),
        actor: actor.to_string(),
        action,
        issue: issue.clone(),
        label: None,
    })
}

/// An `issue_comment` webhook body for a new comment on issue #1 of
/// `acme/widgets`.
pub fn comment_payload(body: &str) -> Vec<u8> {
    serde_json::json!({
        "action": "created",
        "comment": {
            "id": 900,
            "body": body,
            "user": { "login": "bob" },
            "html_url": "https://github.com/acme/widgets/issues/1#issuecomment-900"
        },
        "issue": { "number": 1, "state": "open", "user": { "login": "alice" } },
        "repository": { "owner": { "login": "acme" }, "name": "widgets" },
        "sender": { "login": "bob" }
    })
    .to_string()
    .into_bytes()
}

pub fn context(github: Arc<FakeGitHub>) -> PluginContext {
    PluginContext {
        github,
        bot_name: "ci-bot".to_string(),
        delivery_id: DeliveryId::new("test-delivery"),
    }
}

// ─── FakeGitHub ───────────────────────────────────────────────────────────────

/// Mutable state behind [`FakeGitHub`]. Tests set it up and inspect it
/// through [`FakeGitHub::state`].
#[derive(Debug, Default)]
pub struct FakeState {
    pub entities: BTreeMap<IssueNumber, Entity>,
    pub repo_labels: Vec<String>,
    pub collaborators: Vec<String>,
    pub permissions: BTreeMap<String, Permission>,
    pub permission_lookup_fails: bool,
    pub changed_files: BTreeMap<IssueNumber, Vec<String>>,
    pub linked_issues: BTreeMap<IssueNumber, Vec<IssueNumber>>,
    pub comments: BTreeMap<IssueNumber, Vec<IssueComment>>,
    pub merged: Vec<(IssueNumber, MergeMethod)>,
    /// Every mutating call, in order, as a short description.
    pub calls: Vec<String>,
    next_comment_id: u64,
}

/// An in-memory [`GitHubApi`] that records what plugins do.
#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        self.state().entities.insert(entity.number, entity);
        self
    }

    pub fn with_repo_labels(self, labels: &[&str]) -> Self {
        self.state().repo_labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_collaborators(self, logins: &[&str]) -> Self {
        self.state().collaborators = logins.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_permission(self, login: &str, permission: Permission) -> Self {
        self.state()
            .permissions
            .insert(login.to_string(), permission);
        self
    }

    pub fn with_changed_files(self, number: u64, files: &[&str]) -> Self {
        self.state().changed_files.insert(
            IssueNumber(number),
            files.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_linked_issues(self, number: u64, issues: &[u64]) -> Self {
        self.state().linked_issues.insert(
            IssueNumber(number),
            issues.iter().map(|n| IssueNumber(*n)).collect(),
        );
        self
    }

    pub fn with_comment(self, number: u64, author: &str, body: &str) -> Self {
        {
            let mut state = self.state();
            state.next_comment_id += 1;
            let id = CommentId(state.next_comment_id);
            state
                .comments
                .entry(IssueNumber(number))
                .or_default()
                .push(IssueComment {
                    id,
                    author: author.to_string(),
                    body: body.to_string(),
                });
        }
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn entity(&self, number: u64) -> Entity {
        self.state().entities[&IssueNumber(number)].clone()
    }

    pub fn comment_bodies(&self, number: u64) -> Vec<String> {
        self.state()
            .comments
            .get(&IssueNumber(number))
            .map(|cs| cs.iter().map(|c| c.body.clone()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }
}

fn not_found(what: impl std::fmt::Display) -> GitHubApiError {
    GitHubApiError::with_status(404, format!("{what} not found"))
}

impl FakeState {
    fn entity_mut(&mut self, number: IssueNumber) -> ApiResult<&mut Entity> {
        self.entities.get_mut(&number).ok_or_else(|| not_found(number))
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_issue(&self, _repo: &RepoId, number: IssueNumber) -> ApiResult<Entity> {
        let mut entity = self.state().entity_mut(number)?.clone();
        entity.mergeable = None;
        Ok(entity)
    }

    async fn get_pull_request(&self, _repo: &RepoId, number: IssueNumber) -> ApiResult<Entity> {
        let entity = self.state().entity_mut(number)?.clone();
        if entity.kind != EntityKind::PullRequest {
            return Err(not_found(number));
        }
        Ok(entity)
    }

    async fn list_repo_labels(&self, _repo: &RepoId) -> ApiResult<Vec<String>> {
        Ok(self.state().repo_labels.clone())
    }

    async fn add_labels(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
        labels: &[String],
    ) -> ApiResult<()> {
        let mut state = self.state();
        state.calls.push(format!("add_labels {number} {}", labels.join(",")));
        state.entity_mut(number)?.labels.extend(labels.iter().cloned());
        Ok(())
    }

    async fn remove_label(&self, _repo: &RepoId, number: IssueNumber, label: &str) -> ApiResult<()> {
        let mut state = self.state();
        state.calls.push(format!("remove_label {number} {label}"));
        if !state.entity_mut(number)?.labels.remove(label) {
            return Err(not_found(label));
        }
        Ok(())
    }

    async fn create_comment(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
        body: &str,
    ) -> ApiResult<CommentId> {
        let mut state = self.state();
        state.calls.push(format!("create_comment {number}"));
        state.next_comment_id += 1;
        let id = CommentId(state.next_comment_id);
        state.comments.entry(number).or_default().push(IssueComment {
            id,
            author: "ci-bot".to_string(),
            body: body.to_string(),
        });
        Ok(id)
    }

    async fn list_comments(&self, _repo: &RepoId, number: IssueNumber) -> ApiResult<Vec<IssueComment>> {
        Ok(self.state().comments.get(&number).cloned().unwrap_or_default())
    }

    async fn delete_comment(&self, _repo: &RepoId, id: CommentId) -> ApiResult<()> {
        let mut state = self.state();
        state.calls.push(format!("delete_comment {id}"));
        for comments in state.comments.values_mut() {
            if let Some(pos) = comments.iter().position(|c| c.id == id) {
                comments.remove(pos);
                return Ok(());
            }
        }
        Err(not_found(id))
    }

    async fn set_state(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
        new_state: EntityState,
    ) -> ApiResult<()> {
        let mut state = self.state();
        state.calls.push(format!("set_state {number} {new_state:?}"));
        state.entity_mut(number)?.state = new_state;
        Ok(())
    }

    async fn list_collaborators(&self, _repo: &RepoId) -> ApiResult<Vec<String>> {
        Ok(self.state().collaborators.clone())
    }

    async fn permission(&self, _repo: &RepoId, login: &str) -> ApiResult<Permission> {
        let state = self.state();
        if state.permission_lookup_fails {
            return Err(GitHubApiError::with_status(502, "bad gateway"));
        }
        Ok(state
            .permissions
            .get(login)
            .copied()
            .unwrap_or(Permission::Read))
    }

    async fn set_collaborators(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
        logins: &[String],
    ) -> ApiResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(format!("set_collaborators {number} {}", logins.join(",")));
        state.entity_mut(number)?.collaborators = logins.iter().cloned().collect();
        Ok(())
    }

    async fn list_linked_issues(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
    ) -> ApiResult<Vec<IssueNumber>> {
        Ok(self
            .state()
            .linked_issues
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_changed_files(&self, _repo: &RepoId, number: IssueNumber) -> ApiResult<Vec<String>> {
        Ok(self
            .state()
            .changed_files
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn merge_pull_request(
        &self,
        _repo: &RepoId,
        number: IssueNumber,
        method: MergeMethod,
    ) -> ApiResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(format!("merge_pull_request {number} {}", method.as_str()));
        state.merged.push((number, method));
        state.entity_mut(number)?.state = EntityState::Closed;
        Ok(())
    }
}

// ─── StubPlugin ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    Fail,
    Panic,
}

/// A plugin that counts invocations and then succeeds, fails or panics.
pub struct StubPlugin {
    name: &'static str,
    kinds: &'static [EventKind],
    behavior: StubBehavior,
    delay: Duration,
    pub handled: Arc<AtomicUsize>,
}

impl StubPlugin {
    pub fn new(name: &'static str, kinds: &'static [EventKind], behavior: StubBehavior) -> Self {
        StubPlugin {
            name,
            kinds,
            behavior,
            delay: Duration::ZERO,
            handled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn arc(name: &'static str, kinds: &'static [EventKind]) -> Arc<dyn Plugin> {
        Arc::new(Self::new(name, kinds, StubBehavior::Succeed))
    }

    /// Sleeps for `delay` before acting, so tests can observe in-flight work.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn handled_count(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for StubPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        self.kinds
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name.to_string(),
            description: "Test plugin.".to_string(),
            event_kinds: self.kinds.to_vec(),
            commands: Vec::new(),
            config: Vec::new(),
        }
    }

    async fn handle(&self, _event: &Event, _ctx: &PluginContext) -> Result<(), PluginError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.handled.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            StubBehavior::Succeed => Ok(()),
            StubBehavior::Fail => Err(PluginError::Payload("stub failure".to_string())),
            StubBehavior::Panic => panic!("stub plugin {} panicked", self.name),
        }
    }
}
