//! `/kind`, `/priority`, `/sig` and `/label` commands.
//!
//! Also clears configured labels when a pull request's source branch changes
//! and strips restricted labels a pull request author applied to their own
//! pull request.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::{Arity, Command, Grammar, parse_commands};
use crate::reconcile::{Delta, MissReason, reconcile};
use crate::types::Entity;
use crate::webhooks::{Event, EventKind, NoteEvent, PullRequestAction, PullRequestEvent};

use super::config::RepoScopedConfig;
use super::respond::{code_list, format_quoted_response};
use super::{CommandHelp, Plugin, PluginContext, PluginHelp, Result, by_lowercase};

/// Label prefixes with dedicated commands.
const PREFIXES: [&str; 3] = ["kind", "priority", "sig"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelConfig {
    /// Labels usable through `/label` and `/remove-label`.
    #[serde(default)]
    pub additional_labels: BTreeSet<String>,
    /// Labels a pull request author may not put on their own pull request.
    #[serde(default)]
    pub limit_labels: BTreeSet<String>,
    /// Labels removed whenever a pull request's source branch changes.
    #[serde(default)]
    pub clear_labels: BTreeSet<String>,
}

pub struct LabelPlugin {
    config: RepoScopedConfig<LabelConfig>,
    grammar: Grammar,
}

impl LabelPlugin {
    pub fn new(config: RepoScopedConfig<LabelConfig>) -> Self {
        let mut grammar = Grammar::new();
        for prefix in PREFIXES {
            grammar = grammar
                .with(prefix, Arity::Required)
                .with(format!("remove-{prefix}"), Arity::Required);
        }
        let grammar = grammar
            .with("label", Arity::Required)
            .with("remove-label", Arity::Required);
        LabelPlugin { config, grammar }
    }

    async fn handle_note(&self, event: &NoteEvent, ctx: &PluginContext) -> Result<()> {
        if !event.is_new_comment() {
            return Ok(());
        }
        let Some(config) = self.config.resolve(&event.repo) else {
            return Ok(());
        };
        let commands = parse_commands(&event.comment.body, &self.grammar);
        if commands.is_empty() {
            return Ok(());
        }

        let requested = Requested::from_commands(&commands, &config.additional_labels);

        let repo_labels = by_lowercase(ctx.github.list_repo_labels(&event.repo).await?);
        let entity = ctx
            .github
            .get_issue(&event.repo, event.entity.number)
            .await?;
        let current = by_lowercase(entity.labels);

        let universe: BTreeSet<String> = repo_labels.keys().cloned().collect();
        let current_set: BTreeSet<String> = current.keys().cloned().collect();
        let result = reconcile(&current_set, &requested.delta, &universe, None);

        let to_add: Vec<String> = result
            .added
            .iter()
            .filter_map(|l| repo_labels.get(l).cloned())
            .collect();
        if !to_add.is_empty() {
            info!(repo = %event.repo, number = %event.entity.number, labels = ?to_add, "Adding labels");
            ctx.github
                .add_labels(&event.repo, event.entity.number, &to_add)
                .await?;
        }
        for label in result.removed.iter().filter_map(|l| current.get(l)) {
            info!(repo = %event.repo, number = %event.entity.number, label = %label, "Removing label");
            ctx.github
                .remove_label(&event.repo, event.entity.number, label)
                .await?;
        }

        let mut problems = Vec::new();
        if !requested.unsupported.is_empty() {
            problems.push(format!(
                "The label(s) {} cannot be applied. These labels are supported: {}.",
                code_list(&requested.unsupported),
                code_list(&config.additional_labels.iter().collect::<Vec<_>>()),
            ));
        }
        let missing_in_repo: Vec<&str> = result.misses_with(MissReason::NotValidTarget).collect();
        if !missing_in_repo.is_empty() {
            problems.push(format!(
                "The label(s) {} cannot be applied, because the repository doesn't have them.",
                code_list(&missing_in_repo)
            ));
        }
        let not_set: Vec<&str> = result.misses_with(MissReason::NotCurrentlySet).collect();
        if !not_set.is_empty() {
            problems.push(format!("Those labels are not set: {}.", code_list(&not_set)));
        }

        if !problems.is_empty() {
            let body = format_quoted_response(&event.comment, &problems.join("\n\n"));
            ctx.github
                .create_comment(&event.repo, event.entity.number, &body)
                .await?;
        }
        Ok(())
    }

    async fn handle_pull_request(&self, event: &PullRequestEvent, ctx: &PluginContext) -> Result<()> {
        let Some(config) = self.config.resolve(&event.repo) else {
            return Ok(());
        };
        match event.action {
            PullRequestAction::Synchronize => self.clear_labels(event, config, ctx).await,
            PullRequestAction::Labeled => self.check_limit_label(event, config, ctx).await,
            _ => Ok(()),
        }
    }

    async fn clear_labels(
        &self,
        event: &PullRequestEvent,
        config: &LabelConfig,
        ctx: &PluginContext,
    ) -> Result<()> {
        if config.clear_labels.is_empty() {
            debug!(repo = %event.repo, "No labels to clear on source branch change");
            return Ok(());
        }
        let number = event.pull_request.number;
        let pr = ctx.github.get_issue(&event.repo, number).await?;
        let present = intersect_labels(&pr, &config.clear_labels);
        if present.is_empty() {
            return Ok(());
        }

        for label in &present {
            ctx.github.remove_label(&event.repo, number, label).await?;
        }
        let body = format!(
            "This pull request source branch has changed, label(s): **{}** has been removed.",
            present.join(", ")
        );
        ctx.github.create_comment(&event.repo, number, &body).await?;
        Ok(())
    }

    async fn check_limit_label(
        &self,
        event: &PullRequestEvent,
        config: &LabelConfig,
        ctx: &PluginContext,
    ) -> Result<()> {
        let Some(label) = &event.label else {
            return Ok(());
        };
        if !event.actor.eq_ignore_ascii_case(&event.pull_request.author) {
            return Ok(());
        }
        if !config
            .limit_labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
        {
            return Ok(());
        }

        let number = event.pull_request.number;
        info!(repo = %event.repo, %number, label = %label, "Removing restricted label added by author");
        ctx.github.remove_label(&event.repo, number, label).await?;
        let body = format!(
            "These label(s): **{label}** cannot be added by the author of the pull request, so they have been removed."
        );
        ctx.github.create_comment(&event.repo, number, &body).await?;
        Ok(())
    }
}

/// The label changes requested by one comment.
#[derive(Debug, Default)]
struct Requested {
    delta: Delta,
    /// `/label` arguments outside `additional_labels`.
    unsupported: Vec<String>,
}

impl Requested {
    fn from_commands(commands: &[Command], additional: &BTreeSet<String>) -> Self {
        let additional: BTreeSet<String> = additional.iter().map(|l| l.to_lowercase()).collect();
        let mut requested = Requested::default();

        for command in commands {
            let removing = command.verb == "remove";
            let prefix = if removing {
                command.qualifier.as_deref()
            } else {
                Some(command.verb.as_str())
            };

            let labels: Vec<String> = match prefix {
                Some("label") => command
                    .args
                    .iter()
                    .map(|a| a.to_lowercase())
                    .filter(|l| {
                        let supported = additional.contains(l);
                        if !supported {
                            requested.unsupported.push(l.clone());
                        }
                        supported
                    })
                    .collect(),
                Some(prefix) => command
                    .args
                    .iter()
                    .map(|a| format!("{prefix}/{}", a.to_lowercase()))
                    .collect(),
                None => continue,
            };

            if removing {
                requested.delta.to_remove.extend(labels);
            } else {
                requested.delta.to_add.extend(labels);
            }
        }
        requested
    }
}

fn intersect_labels(entity: &Entity, wanted: &BTreeSet<String>) -> Vec<String> {
    entity
        .labels
        .iter()
        .filter(|l| wanted.iter().any(|w| w.eq_ignore_ascii_case(l)))
        .cloned()
        .collect()
}

#[async_trait]
impl Plugin for LabelPlugin {
    fn name(&self) -> &'static str {
        "label"
    }

    fn event_kinds(&self) -> &'static [EventKind] {
        &[EventKind::Note, EventKind::PullRequest]
    }

    fn help(&self) -> PluginHelp {
        PluginHelp {
            name: self.name().to_string(),
            description: "Adds or removes 'kind/*', 'priority/*' and 'sig/*' labels. Further \
                labels can be enabled per repository for the /label command."
                .to_string(),
            event_kinds: self.event_kinds().to_vec(),
            commands: vec![CommandHelp {
                usage: "/[remove-](kind|priority|sig|label) <target>".to_string(),
                description: "Applies or removes a label from one of the recognized types of labels."
                    .to_string(),
                who_can_use: "Anyone can trigger this command.".to_string(),
                examples: vec![
                    "/kind bug".to_string(),
                    "/sig testing".to_string(),
                    "/label lgtm".to_string(),
                ],
            }],
            config: vec![
                "additional_labels".to_string(),
                "limit_labels".to_string(),
                "clear_labels".to_string(),
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::plugins::RepoScoped;
    use crate::test_utils::{FakeGitHub, context, issue, note, pr_event, pull_request};

    fn plugin(additional: &[&str], limit: &[&str], clear: &[&str]) -> LabelPlugin {
        let set = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        LabelPlugin::new(RepoScopedConfig::new(vec![RepoScoped {
            repos: ["acme".to_string()].into(),
            excluded_repos: BTreeSet::new(),
            payload: LabelConfig {
                additional_labels: set(additional),
                limit_labels: set(limit),
                clear_labels: set(clear),
            },
        }]))
    }

    fn labeled(entity: Entity, labels: &[&str]) -> Entity {
        Entity {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            ..entity
        }
    }

    #[tokio::test]
    async fn swaps_kind_and_reports_missing_label() {
        let target = labeled(issue(1, "alice"), &["kind/bug"]);
        let github = Arc::new(
            FakeGitHub::new()
                .with_entity(target.clone())
                .with_repo_labels(&["kind/bug", "kind/feature"]),
        );
        let event = note(&target, "bob", "/kind feature nonexistent\n/remove-kind bug");

        plugin(&[], &[], &[])
            .handle(&event, &context(github.clone()))
            .await
            .unwrap();

        assert_eq!(
            github.entity(1).labels,
            BTreeSet::from(["kind/feature".to_string()])
        );
        let comments = github.comment_bodies(1);
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains("`kind/nonexistent`"));
        assert!(comments[0].contains("doesn't have them"));
    }

    #[tokio::test]
    async fn already_present_label_is_silent() {
        let target = labeled(issue(2, "alice"), &["Kind/Bug"]);
        let github = Arc::new(
            FakeGitHub::new()
                .with_entity(target.clone())
                .with_repo_labels(&["Kind/Bug"]),
        );

        plugin(&[], &[], &[])
            .handle(&note(&target, "bob", "/KIND bug"), &context(github.clone()))
            .await
            .unwrap();

        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn removing_unset_label_is_reported() {
        let target = issue(3, "alice");
        let github = Arc::new(
            FakeGitHub::new()
                .with_entity(target.clone())
                .with_repo_labels(&["priority/high"]),
        );

        plugin(&[], &[], &[])
            .handle(
                &note(&target, "bob", "/remove-priority high"),
                &context(github.clone()),
            )
            .await
            .unwrap();

        let comments = github.comment_bodies(3);
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains("Those labels are not set: `priority/high`"));
        assert!(comments[0].contains("> /remove-priority high"));
    }

    #[tokio::test]
    async fn generic_label_is_limited_to_additional_labels() {
        let target = issue(4, "alice");
        let github = Arc::new(
            FakeGitHub::new()
                .with_entity(target.clone())
                .with_repo_labels(&["lgtm", "wontfix"]),
        );

        plugin(&["lgtm"], &[], &[])
            .handle(&note(&target, "bob", "/label lgtm\n/label wontfix"), &context(github.clone()))
            .await
            .unwrap();

        assert_eq!(github.entity(4).labels, BTreeSet::from(["lgtm".to_string()]));
        let comments = github.comment_bodies(4);
        assert!(comments[0].contains("`wontfix` cannot be applied"));
    }

    #[tokio::test]
    async fn unconfigured_repo_is_ignored() {
        let target = issue(5, "alice");
        let github = Arc::new(
            FakeGitHub::new()
                .with_entity(target.clone())
                .with_repo_labels(&["kind/bug"]),
        );
        let plugin = LabelPlugin::new(RepoScopedConfig::default());

        plugin
            .handle(&note(&target, "bob", "/kind bug"), &context(github.clone()))
            .await
            .unwrap();

        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn synchronize_clears_configured_labels() {
        let pr = labeled(pull_request(6, "alice"), &["lgtm", "kind/bug"]);
        let github = Arc::new(FakeGitHub::new().with_entity(pr.clone()));

        plugin(&[], &[], &["lgtm", "approved"])
            .handle(
                &pr_event(PullRequestAction::Synchronize, &pr, "alice"),
                &context(github.clone()),
            )
            .await
            .unwrap();

        assert_eq!(
            github.entity(6).labels,
            BTreeSet::from(["kind/bug".to_string()])
        );
        assert_eq!(
            github.comment_bodies(6),
            vec!["This pull request source branch has changed, label(s): **lgtm** has been removed."]
        );
    }

    #[tokio::test]
    async fn author_cannot_apply_limited_label() {
        let pr = labeled(pull_request(7, "alice"), &["approved"]);
        let github = Arc::new(FakeGitHub::new().with_entity(pr.clone()));
        let mut event = pr_event(PullRequestAction::Labeled, &pr, "alice");
        if let Event::PullRequest(e) = &mut event {
            e.label = Some("approved".to_string());
        }

        plugin(&[], &["approved"], &[])
            .handle(&event, &context(github.clone()))
            .await
            .unwrap();

        assert!(github.entity(7).labels.is_empty());
        assert_eq!(github.comment_bodies(7).len(), 1);
    }

    #[tokio::test]
    async fn others_may_apply_limited_label() {
        let pr = labeled(pull_request(8, "alice"), &["approved"]);
        let github = Arc::new(FakeGitHub::new().with_entity(pr.clone()));
        let mut event = pr_event(PullRequestAction::Labeled, &pr, "bob");
        if let Event::PullRequest(e) = &mut event {
            e.label = Some("approved".to_string());
        }

        plugin(&[], &["approved"], &[])
            .handle(&event, &context(github.clone()))
            .await
            .unwrap();

        assert!(github.calls().is_empty());
    }

    #[test]
    fn requested_labels_from_commands() {
        let grammar = plugin(&[], &[], &[]).grammar;
        let commands = parse_commands("/sig Node\n/remove-kind bug\n/label foo", &grammar);
        let requested = Requested::from_commands(&commands, &BTreeSet::new());
        assert_eq!(requested.delta, Delta::new(["sig/node"], ["kind/bug"]));
        assert_eq!(requested.unsupported, vec!["foo".to_string()]);
    }
}
