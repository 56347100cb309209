//! Command plugins and the registry that routes events to them.
//!
//! A plugin declares the [`EventKind`]s it handles and gets every matching
//! event through [`Plugin::handle`]. Plugins never share mutable state: each
//! invocation sees a read-only [`Event`] and talks to GitHub through
//! [`PluginContext::github`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::github::{GitHubApi, GitHubApiError};
use crate::types::DeliveryId;
use crate::webhooks::{Event, EventKind};

pub mod approvers;
pub mod assign;
pub mod associate;
pub mod config;
pub mod label;
pub mod lifecycle;
pub mod registry;
pub mod respond;
pub mod tide;

pub use config::{RepoScoped, RepoScopedConfig};
pub use registry::{PluginRegistry, RegistryError};

/// Errors a plugin invocation can end with.
///
/// These never reach the webhook caller; the router logs them with the
/// plugin name and delivery ID.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Api(#[from] GitHubApiError),

    /// The event lacks something this plugin needs.
    #[error("unexpected payload: {0}")]
    Payload(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;

/// Maps lowercased names (labels, logins) to their spelling on GitHub.
pub(crate) fn by_lowercase<I: IntoIterator<Item = String>>(names: I) -> BTreeMap<String, String> {
    names.into_iter().map(|n| (n.to_lowercase(), n)).collect()
}

/// Per-delivery context handed to every plugin invocation.
#[derive(Clone)]
pub struct PluginContext {
    pub github: Arc<dyn GitHubApi>,
    /// Login the bot comments as; used to recognise its own comments.
    pub bot_name: String,
    pub delivery_id: DeliveryId,
}

/// One command a plugin understands, for the help endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CommandHelp {
    pub usage: String,
    pub description: String,
    pub who_can_use: String,
    pub examples: Vec<String>,
}

/// What a plugin does, for the help endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PluginHelp {
    pub name: String,
    pub description: String,
    pub event_kinds: Vec<EventKind>,
    pub commands: Vec<CommandHelp>,
    /// The configuration keys this plugin reads.
    pub config: Vec<String>,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique registry name; also the plugin's section in the config file.
    fn name(&self) -> &'static str;

    fn event_kinds(&self) -> &'static [EventKind];

    fn help(&self) -> PluginHelp;

    /// Handles one event whose kind is in [`Plugin::event_kinds`].
    ///
    /// Returns `Ok(())` for events that do not concern the plugin, including
    /// events from repositories it is not configured for.
    async fn handle(&self, event: &Event, ctx: &PluginContext) -> Result<()>;
}
