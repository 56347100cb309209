//! Suggests approvers for new pull requests and on `/suggest-approvers`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::{Arity, Grammar, parse_commands};
use crate::owners::{OwnersEntry, OwnersIndex, suggest};
use crate::types::{IssueNumber, RepoId};
use crate::webhooks::{Event, EventKind, NoteEvent, PullRequestAction, PullRequestEvent};

use super::config::RepoScopedConfig;
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproversConfig {
    /// Ownership declarations keyed by directory; `""` is the repository root.
    #[serde(default)]
    pub owners: BTreeMap<String, OwnersEntry>,
}

impl ApproversConfig {
    pub fn index(&self) -> OwnersIndex {
        OwnersIndex::new(self.owners.iter().map(|(dir, entry)| (dir, entry.clone())))
    }
}

pub struct ApproversPlugin {
    config: RepoScopedConfig<ApproversConfig>,
    grammar: Grammar,
}

impl ApproversPlugin {
    pub fn new(config: RepoScopedConfig<ApproversConfig>) -> Self {
        ApproversPlugin {
            config,
            grammar: Grammar::new().with("suggest-approvers", Arity::None),
        }
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() || !event.entity.is_pull_request() {
            return Ok(());
        }
        if !parse_commands(&event.comment.body, &self.grammar)
            .iter()
            .any(|c| c.is("suggest-approvers"))
        {
            return Ok(());
        }
        self.suggest_for(&event.repo, event.entity.number, &event.entity.author, ctx)
            .await
    }

    async fn handle_pull_request(&self, event: &PullRequestEvent, ctx: &PluginContext) -> Result<()> {
        if !matches!(
            event.action,
            PullRequestAction::Opened | PullRequestAction::Reopened
        ) {
            return Ok(());
        }
        let pr = &event.pull_request;
        self.suggest_for(&event.repo, pr.number, &pr.author, ctx).await
    }

    async fn suggest_for(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        author: &str,
        ctx: &PluginContext,
    ) -> Result<()> {
        let Some(config) = self.config.resolve(repo) else {
            return Ok(());
        };
        let index = config.index();
        if index.is_empty() {
            debug!(%repo, "No ownership declarations configured");
            return Ok(());
        }

        let files = ctx.github.list_changed_files(repo, number).await?;
        // The author counts as having approved whatever they own.
        let known = BTreeSet::from([author.to_string()]);
        let picks = suggest(&files, &index, &known, number.0);
        if picks.is_empty() {
            debug!(%repo, %number, "No approvers to suggest");
            return Ok(());
        }

        info!(%repo, %number, approvers = ?picks, "Suggesting approvers");
        let mentions: Vec<String> = picks.iter().map(|a| format!("@{a}")).collect();
        let body = format!(
            "@{author}, this pull request needs approval from the owners of the files it \
             changes.\n\nSuggested approvers: {}",
            mentions.join(", ")
        );
        ctx.github.create_comment(repo, number, &body).await?;
        Ok(())
    }
}

#[async_trait]
impl Plugin for ApproversPlugin {
    fn name(&self) -> &'static str {
        "approvers"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::PullRequest, EventKind::Note]
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name().to_string(),
            description: "Suggests a small set of approvers covering every directory a pull \
                request changes."
                .to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![CommandHelp {
                usage: "/suggest-approvers".to_string(),
                description: "Suggests approvers for the pull request again.".to_string(),
                who_can_use: "Anyone".to_string(),
                examples: vec!["/suggest-approvers".to_string()],
            }],
            config: vec!["owners".to_string()],
        }
    }

    async fn handle(&self, event: &Event, ctx: &PluginContext) -> Result<()> {
        match event {
            Event::Note(note) => self.handle_note(note, ctx).await,
            Event::PullRequest(pr) => self.handle_pull_request(pr, ctx).await,
            _ => Ok(()),
        }
    }
}
