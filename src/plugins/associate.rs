//! Issue and milestone association checks.
//!
//! Pull requests must link an issue they close, and issues must carry a
//! milestone. Whatever is missing is flagged with a label, which the matching
//! check command clears again once the link or milestone is in place.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::{Arity, Grammar, parse_commands};
use crate::types::{Entity, RepoId};
use crate::webhooks::{
    Event, EventKind, IssueAction, IssueEvent, NoteEvent, PullRequestAction, PullRequestEvent,
};

use super::config::RepoScopedConfig;
use super::respond::format_quoted_response;
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result};

pub const MISS_ISSUE_LABEL: &str = "miss/issue";
pub const MISS_MILESTONE_LABEL: &str = "miss/milestone";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociateConfig {}

pub struct AssociatePlugin {
    config: RepoScopedConfig<AssociateConfig>,
    grammar: Grammar,
}

impl AssociatePlugin {
    pub fn new(config: RepoScopedConfig<AssociateConfig>) -> Self {
        let grammar = Grammar::new()
            .with("check-milestone", Arity::None)
            .with("check-issue", Arity::None)
            .with("remove-miss/issue", Arity::None);
        AssociatePlugin { config, grammar }
    }

    fn enabled(&self, repo: &RepoId) -> bool {
        self.config.resolve(repo).is_some()
    }

    async fn handle_issue(&self, event: &IssueEvent, ctx: &PluginContext) -> Result<()> {
        let relevant = matches!(
            event.action,
            IssueAction::Opened | IssueAction::Milestoned | IssueAction::Demilestoned
        );
        if !relevant || event.issue.is_pull_request() || !self.enabled(&event.repo) {
            return Ok(());
        }
        check_milestone(&event.repo, &event.issue, ctx).await
    }

    async fn handle_pull_request(&self, event: &PullRequestEvent, ctx: &PluginContext) -> Result<()> {
        if event.action != PullRequestAction::Opened || !self.enabled(&event.repo) {
            return Ok(());
        }
        check_issue(&event.repo, &event.pull_request, ctx).await
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() || !self.enabled(&event.repo) {
            return Ok(());
        }
        for command in parse_commands(&event.comment.body, &self.grammar) {
            match (command.name().as_str(), event.entity.is_pull_request()) {
                ("check-milestone", false) => {
                    check_milestone(&event.repo, &event.entity, ctx).await?;
                }
                ("check-issue", true) => check_issue(&event.repo, &event.entity, ctx).await?,
                ("remove-miss/issue", true) => remove_miss_issue(event, ctx).await?,
                _ => debug!(command = %command.name(), "Command does not apply to this entity"),
            }
        }
        Ok(())
    }
}

/// The entity's spelling of `label`, if it carries it.
fn present_label<'a>(entity: &'a Entity, label: &str) -> Option<&'a str> {
    entity
        .labels
        .iter()
        .find(|l| l.eq_ignore_ascii_case(label))
        .map(String::as_str)
}

/// Adds `label` and explains why, or removes it once `satisfied`.
async fn flag(
    repo: &RepoId,
    entity: &Entity,
    label: &str,
    satisfied: bool,
    explanation: &str,
    ctx: &PluginContext,
) -> Result<()> {
    match (present_label(entity, label), satisfied) {
        (None, false) => {
            info!(%repo, number = %entity.number, label, "Flagging missing association");
            ctx.github
                .add_labels(repo, entity.number, &[label.to_string()])
                .await?;
            let body = format!("@{} {explanation}", entity.author);
            ctx.github.create_comment(repo, entity.number, &body).await?;
        }
        (Some(present), true) => {
            info!(%repo, number = %entity.number, label, "Association satisfied; removing flag");
            ctx.github.remove_label(repo, entity.number, present).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn check_milestone(repo: &RepoId, issue: &Entity, ctx: &PluginContext) -> Result<()> {
    let explanation = format!(
        "This issue must be assigned to a milestone. After setting one, you can use the \
         **/check-milestone** command to remove the **{MISS_MILESTONE_LABEL}** label."
    );
    flag(
        repo,
        issue,
        MISS_MILESTONE_LABEL,
        issue.milestone.is_some(),
        &explanation,
        ctx,
    )
    .await
}

async fn check_issue(repo: &RepoId, pr: &Entity, ctx: &PluginContext) -> Result<()> {
    let linked = ctx.github.list_linked_issues(repo, pr.number).await?;
    let explanation = format!(
        "This pull request must be linked to at least one issue it closes. After linking an \
         issue, you can use the **/check-issue** command to remove the **{MISS_ISSUE_LABEL}** \
         label."
    );
    flag(repo, pr, MISS_ISSUE_LABEL, !linked.is_empty(), &explanation, ctx).await
}

/// Lets a repository collaborator waive the linked-issue requirement.
async fn remove_miss_issue(event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
    let Some(present) = present_label(&event.entity, MISS_ISSUE_LABEL) else {
        return Ok(());
    };
    let commenter = &event.comment.author;
    let collaborators = ctx.github.list_collaborators(&event.repo).await?;
    if !collaborators.iter().any(|c| c.eq_ignore_ascii_case(commenter)) {
        let message =
            "Only collaborators of this repository can use the **/remove-miss/issue** command.";
        let body = format_quoted_response(&event.comment, message);
        ctx.github
            .create_comment(&event.repo, event.entity.number, &body)
            .await?;
        return Ok(());
    }
    info!(repo = %event.repo, number = %event.entity.number, actor = %commenter, "Waiving linked issue");
    ctx.github
        .remove_label(&event.repo, event.entity.number, present)
        .await?;
    Ok(())
}

#[async_trait]
impl Plugin for AssociatePlugin {
    fn name(&self) -> &'static str {
        "associate"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::Issue, EventKind::Note, EventKind::PullRequest]
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name().to_string(),
            description: "Flags issues without a milestone and pull requests without a linked \
                issue."
                .to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![
                CommandHelp {
                    usage: "/check-milestone".to_string(),
                    description: format!(
                        "Checks whether the issue has a milestone, adding or removing the \
                         {MISS_MILESTONE_LABEL} label."
                    ),
                    who_can_use: "Anyone".to_string(),
                    examples: vec!["/check-milestone".to_string()],
                },
                CommandHelp {
                    usage: "/check-issue".to_string(),
                    description: format!(
                        "Checks whether the pull request links an issue, adding or removing the \
                         {MISS_ISSUE_LABEL} label."
                    ),
                    who_can_use: "Anyone".to_string(),
                    examples: vec!["/check-issue".to_string()],
                },
                CommandHelp {
                    usage: "/remove-miss/issue".to_string(),
                    description: format!("Removes the {MISS_ISSUE_LABEL} label."),
                    who_can_use: "Repository collaborators.".to_string(),
                    examples: vec!["/remove-miss/issue".to_string()],
                },
            ],
            config: Vec::new(),
        }
    }

    async fn handle(&self, event: &Event, ctx: &PluginContext) -> Result<()> {
        match event {
            Event::Issue(issue) => self.handle_issue(issue, ctx).await,
            Event::PullRequest(pr) => self.handle_pull_request(pr, ctx).await,
            Event::Note(note) => self.handle_note(note, ctx).await,
            _ => Ok(()),
        }
    }
}
