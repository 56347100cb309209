//! Merges pull requests once their labels say they are ready.
//!
//! Runs on `/check-pr` and whenever an open pull request gets a label. A
//! pull request merges when it is mergeable, carries every configured
//! `labels` entry and none of the `missing_labels`. Otherwise the author is
//! told what is wrong; earlier notices from the bot are deleted first so
//! only the latest one stays visible.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::commands::{Arity, Grammar, parse_commands};
use crate::github::MergeMethod;
use crate::types::{Entity, IssueNumber, RepoId};
use crate::webhooks::{Event, EventKind, NoteEvent, PullRequestAction, PullRequestEvent};

use super::config::RepoScopedConfig;
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result};

/// Marker shared by every notice the plugin posts.
const NOT_MERGEABLE: &str = "This pr is **not** mergeable.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TideConfig {
    /// Labels a pull request must carry to merge.
    pub labels: BTreeSet<String>,
    /// Labels that block merging.
    #[serde(default)]
    pub missing_labels: BTreeSet<String>,
    #[serde(default)]
    pub merge_method: MergeMethod,
}

impl TideConfig {
    /// Required labels that are absent, and blocking labels that are present.
    fn label_diff(&self, present: &BTreeSet<String>) -> (Vec<String>, Vec<String>) {
        let has = |wanted: &String| present.iter().any(|l| l.eq_ignore_ascii_case(wanted));
        let missing = self.labels.iter().filter(|l| !has(l)).cloned().collect();
        let blocking = self.missing_labels.iter().filter(|l| has(l)).cloned().collect();
        (missing, blocking)
    }
}

fn notice(author: &str, detail: &str) -> String {
    format!("@{author}, {NOT_MERGEABLE} {detail}")
}

fn label_notice(author: &str, missing: &[String], blocking: &[String]) -> String {
    let detail = match (missing.is_empty(), blocking.is_empty()) {
        (false, false) => format!(
            "It needs **{}** labels and needs to remove **{}** labels to get merged.",
            missing.join(", "),
            blocking.join(", ")
        ),
        (false, true) => format!("It needs **{}** labels to get merged.", missing.join(", ")),
        _ => format!(
            "It needs to remove **{}** labels to get merged.",
            blocking.join(", ")
        ),
    };
    notice(author, &detail)
}

pub struct TidePlugin {
    config: RepoScopedConfig<TideConfig>,
    grammar: Grammar,
}

impl TidePlugin {
    pub fn new(config: RepoScopedConfig<TideConfig>) -> Self {
        TidePlugin {
            config,
            grammar: Grammar::new().with("check-pr", Arity::None),
        }
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() || !event.entity.is_pull_request() {
            return Ok(());
        }
        if !parse_commands(&event.comment.body, &self.grammar)
            .iter()
            .any(|c| c.is("check-pr"))
        {
            return Ok(());
        }
        self.check(&event.repo, event.entity.number, ctx).await
    }

    async fn handle_pull_request(&self, event: &PullRequestEvent, ctx: &PluginContext) -> Result<()> {
        if event.action != PullRequestAction::Labeled || !event.pull_request.is_open() {
            return Ok(());
        }
        self.check(&event.repo, event.pull_request.number, ctx).await
    }

    async fn check(&self, repo: &RepoId, number: IssueNumber, ctx: &PluginContext) -> Result<()> {
        let Some(config) = self.config.resolve(repo) else {
            return Ok(());
        };

        self.delete_old_notices(repo, number, ctx).await?;

        let pr = ctx.github.get_pull_request(repo, number).await?;
        if !pr.is_open() {
            debug!(%repo, %number, "Pull request is not open");
            return Ok(());
        }

        match pr.mergeable {
            Some(false) => {
                let body = notice(&pr.author, "Because it conflicts to the target branch.");
                ctx.github.create_comment(repo, number, &body).await?;
                return Ok(());
            }
            None => {
                debug!(%repo, %number, "Mergeability not yet computed; skipping");
                return Ok(());
            }
            Some(true) => {}
        }

        self.merge_or_explain(repo, &pr, config, ctx).await
    }

    async fn merge_or_explain(
        &self,
        repo: &RepoId,
        pr: &Entity,
        config: &TideConfig,
        ctx: &PluginContext,
    ) -> Result<()> {
        let (missing, blocking) = config.label_diff(&pr.labels);
        if missing.is_empty() && blocking.is_empty() {
            info!(%repo, number = %pr.number, method = config.merge_method.as_str(), "Merging pull request");
            ctx.github
                .merge_pull_request(repo, pr.number, config.merge_method)
                .await?;
            return Ok(());
        }

        let body = label_notice(&pr.author, &missing, &blocking);
        ctx.github.create_comment(repo, pr.number, &body).await?;
        Ok(())
    }

    async fn delete_old_notices(
        &self,
        repo: &RepoId,
        number: IssueNumber,
        ctx: &PluginContext,
    ) -> Result<()> {
        let comments = ctx.github.list_comments(repo, number).await?;
        for comment in comments
            .iter()
            .filter(|c| c.author == ctx.bot_name && c.body.contains(NOT_MERGEABLE))
        {
            if let Err(e) = ctx.github.delete_comment(repo, comment.id).await {
                warn!(%repo, %number, comment = %comment.id, error = %e, "Failed to delete old notice");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for TidePlugin {
    fn name(&self) -> &'static str {
        "tide"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::Note, EventKind::PullRequest]
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name().to_string(),
            description: "Checks the labels and mergeability of pull requests and merges them \
                when possible."
                .to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![CommandHelp {
                usage: "/check-pr".to_string(),
                description: "Forces rechecking the pull request and merges it if possible."
                    .to_string(),
                who_can_use: "Anyone".to_string(),
                examples: vec!["/check-pr".to_string()],
            }],
            config: vec![
                "labels".to_string(),
                "missing_labels".to_string(),
                "merge_method".to_string(),
            ],
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
