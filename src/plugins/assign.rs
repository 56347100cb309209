//! `/add-collaborator`, `/rm-collaborator`, `/assign` and `/unassign`.
//!
//! Both command families edit the entity's assignees. Candidates must be
//! repository collaborators. `/add-collaborator` never adds the entity's
//! author; `/assign` may. Logins are matched case-insensitively and written
//! back in GitHub's spelling.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::commands::{Arity, Grammar, parse_commands};
use crate::reconcile::{Delta, MissReason, Reconciliation, is_author_or_privileged, reconcile};
use crate::webhooks::{Event, EventKind, NoteEvent};

use super::config::RepoScopedConfig;
use super::respond::{code_list, format_quoted_response};
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result, by_lowercase};

/// The assign plugin has no settings beyond the repositories it covers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignConfig {}

/// The command family a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    /// `/add-collaborator`, `/rm-collaborator`
    Collaborator,
    /// `/assign`, `/unassign`
    Assign,
}

/// Logins requested by one command family, keyed by lowercase login.
#[derive(Debug, Default)]
struct LoginRequest {
    delta: Delta,
    /// Lowercase login to the spelling used in the comment.
    typed: BTreeMap<String, String>,
}

impl LoginRequest {
    fn push(&mut self, login: &str, adding: bool) {
        let key = login.to_lowercase();
        self.typed
            .entry(key.clone())
            .or_insert_with(|| login.to_string());
        if adding {
            self.delta.to_add.insert(key);
        } else {
            self.delta.to_remove.insert(key);
        }
    }

    fn logins(&self) -> impl Iterator<Item = &String> {
        self.delta.to_add.iter().chain(&self.delta.to_remove)
    }
}

#[derive(Debug, Default)]
struct Requests {
    collaborator: LoginRequest,
    assign: LoginRequest,
}

impl Requests {
    fn is_empty(&self) -> bool {
        self.collaborator.delta.is_empty() && self.assign.delta.is_empty()
    }

    fn logins(&self) -> impl Iterator<Item = &String> {
        self.collaborator.logins().chain(self.assign.logins())
    }

    /// Non-empty requests, collaborator commands first.
    fn pending(&self) -> impl Iterator<Item = (Family, &LoginRequest)> {
        [
            (Family::Collaborator, &self.collaborator),
            (Family::Assign, &self.assign),
        ]
        .into_iter()
        .filter(|(_, request)| !request.delta.is_empty())
    }
}

pub struct AssignPlugin {
    config: RepoScopedConfig<AssignConfig>,
    grammar: Grammar,
}

impl AssignPlugin {
    pub fn new(config: RepoScopedConfig<AssignConfig>) -> Self {
        let grammar = Grammar::new()
            .with("add-collaborator", Arity::Optional)
            .with("rm-collaborator", Arity::Optional)
            .with("assign", Arity::Optional)
            .with("unassign", Arity::Optional);
        AssignPlugin { config, grammar }
    }

    /// Collects the requested changes; a command without logins targets the
    /// commenter.
    fn requests(&self, event: &NoteEvent) -> Requests {
        let mut requests = Requests::default();
        for command in parse_commands(&event.comment.body, &self.grammar) {
            let (request, adding) = match command.verb.as_str() {
                "add" => (&mut requests.collaborator, true),
                "rm" => (&mut requests.collaborator, false),
                "assign" => (&mut requests.assign, true),
                "unassign" => (&mut requests.assign, false),
                _ => continue,
            };
            if command.args.is_empty() {
                request.push(&event.comment.author, adding);
                continue;
            }
            for arg in &command.args {
                let login = arg.trim_start_matches('@');
                if !login.is_empty() {
                    request.push(login, adding);
                }
            }
        }
        requests
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() || self.config.resolve(&event.repo).is_none() {
            return Ok(());
        }
        let requests = self.requests(event);
        if requests.is_empty() {
            return Ok(());
        }

        let commenter = &event.comment.author;
        let only_self = requests
            .logins()
            .all(|login| login.eq_ignore_ascii_case(commenter));
        if !only_self {
            let allowed = is_author_or_privileged(&event.entity.author, commenter, |login| async move {
                ctx.github
                    .permission(&event.repo, &login)
                    .await
                    .map(|p| p.is_elevated())
            })
            .await;
            if !allowed {
                let message = format!(
                    "You can't change the collaborators of this {} unless you authored it or you have write access.",
                    event.entity.kind.noun()
                );
                let body = format_quoted_response(&event.comment, &message);
                ctx.github
                    .create_comment(&event.repo, event.entity.number, &body)
                    .await?;
                return Ok(());
            }
        }

        for (family, request) in requests.pending() {
            self.apply(event, family, request, ctx).await?;
        }
        Ok(())
    }

    /// Re-reads the assignees and repository collaborators, then writes the
    /// reconciled assignee set and reports what was refused.
    async fn apply(
        &self,
        event: &NoteEvent,
        family: Family,
        request: &LoginRequest,
        ctx: &PluginContext,
    ) -> Result<()> {
        let entity = ctx
            .github
            .get_issue(&event.repo, event.entity.number)
            .await?;
        let members = by_lowercase(ctx.github.list_collaborators(&event.repo).await?);
        let universe: BTreeSet<String> = members.keys().cloned().collect();

        // Assignees who are no longer repository collaborators are dropped.
        let current: BTreeSet<String> = entity
            .collaborators
            .iter()
            .map(|l| l.to_lowercase())
            .filter(|l| universe.contains(l))
            .collect();
        let author = entity.author.to_lowercase();
        let conflicting = match family {
            Family::Collaborator => Some(author.as_str()),
            Family::Assign => None,
        };

        let mut result = reconcile(&current, &request.delta, &universe, conflicting);
        for miss in &mut result.misses {
            if let Some(typed) = request.typed.get(&miss.value) {
                miss.value = typed.clone();
            }
        }

        let target: BTreeSet<String> = result
            .apply
            .iter()
            .filter_map(|l| members.get(l).cloned())
            .collect();
        if target != entity.collaborators {
            info!(
                repo = %event.repo,
                number = %entity.number,
                added = ?result.added,
                removed = ?result.removed,
                "Updating collaborators"
            );
            let logins: Vec<String> = target.into_iter().collect();
            ctx.github
                .set_collaborators(&event.repo, entity.number, &logins)
                .await?;
        }

        let message = match family {
            Family::Collaborator => collaborator_miss_message(&result),
            Family::Assign => assign_miss_message(&result, &members),
        };
        if let Some(message) = message {
            let body = format_quoted_response(&event.comment, &message);
            ctx.github
                .create_comment(&event.repo, entity.number, &body)
                .await?;
        }
        Ok(())
    }
}

fn collaborator_miss_message(result: &Reconciliation) -> Option<String> {
    let mut parts = Vec::new();
    let not_members: Vec<&str> = result.misses_with(MissReason::NotValidTarget).collect();
    if !not_members.is_empty() {
        parts.push(format!(
            "{} cannot be added because they are not collaborators of this repository.",
            code_list(&not_members)
        ));
    }
    let not_set: Vec<&str> = result.misses_with(MissReason::NotCurrentlySet).collect();
    if !not_set.is_empty() {
        parts.push(format!(
            "{} cannot be removed because they are not collaborators here.",
            code_list(&not_set)
        ));
    }
    let authors: Vec<&str> = result.misses_with(MissReason::ConflictingRole).collect();
    if !authors.is_empty() {
        parts.push(format!(
            "{} cannot be added because they are the author.",
            code_list(&authors)
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!(
            "GitHub didn't allow you to change the following collaborators.\n\n{}",
            parts.join("\n\n")
        ))
    }
}

/// `/unassign` of someone not assigned is not worth a comment.
fn assign_miss_message(result: &Reconciliation, members: &BTreeMap<String, String>) -> Option<String> {
    let refused: Vec<&str> = result.misses_with(MissReason::NotValidTarget).collect();
    if refused.is_empty() {
        return None;
    }
    let mut message = format!("GitHub didn't allow you to assign to: {}.", refused.join(", "));
    if !members.is_empty() {
        let choices: Vec<&str> = members.values().map(String::as_str).collect();
        message.push_str("\n\nChoose following members as assignees.\n- ");
        message.push_str(&choices.join("\n- "));
    }
    Some(message)
}

#[async_trait]
impl Plugin for AssignPlugin {
    fn name(&self) -> &'static str {
        "assign"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::Note]
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name().to_string(),
            description: "Adds or removes collaborators (assignees) of issues and pull requests."
                .to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![
                CommandHelp {
                    usage: "/[add|rm]-collaborator [[@]<username>...]".to_string(),
                    description: "Adds or removes collaborators. Without a username the \
                        commenter is targeted. The author cannot be added."
                        .to_string(),
                    who_can_use: "Anyone can target themselves. Changing others requires being \
                        the author or having write access. Targets must be repository \
                        collaborators."
                        .to_string(),
                    examples: vec![
                        "/add-collaborator".to_string(),
                        "/rm-collaborator".to_string(),
                        "/add-collaborator @spongebob".to_string(),
                        "/add-collaborator spongebob patrick".to_string(),
                    ],
                },
                CommandHelp {
                    usage: "/[un]assign [[@]<username>...]".to_string(),
                    description: "Assigns or unassigns users. Without a username the commenter \
                        is targeted."
                        .to_string(),
                    who_can_use: "Anyone can target themselves. Changing others requires being \
                        the author or having write access. Targets must be repository \
                        collaborators."
                        .to_string(),
                    examples: vec![
                        "/assign".to_string(),
                        "/unassign".to_string(),
                        "/assign @spongebob".to_string(),
                    ],
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
