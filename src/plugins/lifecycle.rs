//! `/close` and `/reopen`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::{Arity, Grammar, parse_commands};
use crate::reconcile::is_author_or_privileged;
use crate::types::EntityState;
use crate::webhooks::{Event, EventKind, NoteEvent};

use super::config::RepoScopedConfig;
use super::respond::format_quoted_response;
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleConfig {}

pub struct LifecyclePlugin {
    config: RepoScopedConfig<LifecycleConfig>,
    grammar: Grammar,
}

impl LifecyclePlugin {
    pub fn new(config: RepoScopedConfig<LifecycleConfig>) -> Self {
        let grammar = Grammar::new()
            .with("close", Arity::None)
            .with("reopen", Arity::None);
        LifecyclePlugin { config, grammar }
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() || self.config.resolve(&event.repo).is_none() {
            return Ok(());
        }
        let commands = parse_commands(&event.comment.body, &self.grammar);
        let closing = commands.iter().any(|c| c.is("close"));
        let reopening = commands.iter().any(|c| c.is("reopen"));

        let target = match (event.entity.state, closing, reopening) {
            (EntityState::Open, true, _) => EntityState::Closed,
            (EntityState::Closed, _, true) => EntityState::Open,
            _ => return Ok(()),
        };

        let entity = &event.entity;
        let kind = entity.kind;
        let allowed = is_author_or_privileged(&entity.author, &event.comment.author, |login| async move {
            ctx.github
                .permission(&event.repo, &login)
                .await
                .map(|p| p.is_elevated())
        })
        .await;

        let message = if !allowed {
            debug!(repo = %event.repo, number = %entity.number, actor = %event.comment.author, "Refusing state change");
            match target {
                EntityState::Closed => format!(
                    "You can't close {} unless you authored it or you are a collaborator.",
                    kind.with_article()
                ),
                EntityState::Open => format!(
                    "You can't reopen {} unless you are the author of it or a collaborator.",
                    kind.with_article()
                ),
            }
        } else {
            info!(repo = %event.repo, number = %entity.number, state = ?target, "Changing state");
            ctx.github
                .set_state(&event.repo, entity.number, target)
                .await?;
            match target {
                EntityState::Closed => format!("Closed this {}.", kind.noun()),
                EntityState::Open => format!("Reopened this {}.", kind.noun()),
            }
        };

        let body = format_quoted_response(&event.comment, &message);
        ctx.github
            .create_comment(&event.repo, entity.number, &body)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Plugin for LifecyclePlugin {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::Note]
    }

    fn help(&self) -> PluginHelp {
        let who = "Authors and collaborators with write access.".to_string();
        PluginHelp {
            name: self.name().to_string(),
            description: "Closes and reopens issues and pull requests.".to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![
                CommandHelp {
                    usage: "/close".to_string(),
                    description: "Closes an issue or pull request.".to_string(),
                    who_can_use: who.clone(),
                    examples: vec!["/close".to_string()],
                },
                CommandHelp {
                    usage: "/reopen".to_string(),
                    description: "Reopens a closed issue or pull request.".to_string(),
                    who_can_use: who,
                    examples: vec!["/reopen".to_string()],
                },
            ],
            config: Vec::new(),
        }
    }

    async fn handle(&self, event: &Event, ctx: &PluginContext) -> Result<()> {
        match event {
            Event::Note(note) => self.handle_note(note, ctx).await,
            _ => Ok(()),
        }
    }
}
