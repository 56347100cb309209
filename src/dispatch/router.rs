//! Decodes accepted webhooks and fans them out to plugins.

use std::sync::Arc;

use thiserror::Error;
use tracing::{Instrument, debug, error, info_span, instrument};

use crate::github::GitHubApi;
use crate::metrics::Metrics;
use crate::plugins::{Plugin, PluginContext, PluginError, PluginRegistry};
use crate::types::DeliveryId;
use crate::webhooks::{Event, ParseError, parse_webhook};

use super::inflight::InFlightTasks;

/// Errors surfaced by [`EventRouter::dispatch`]. The webhook has already
/// been acknowledged when these happen, so they are only logged.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to decode payload: {0}")]
    Decode(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// How a single plugin invocation went wrong.
#[derive(Debug, Error)]
pub enum PluginFailure {
    #[error("plugin {plugin} failed: {source}")]
    Failed {
        plugin: &'static str,
        #[source]
        source: PluginError,
    },

    #[error("plugin {plugin} panicked")]
    Panicked { plugin: &'static str },

    #[error("plugin {plugin} was cancelled")]
    Cancelled { plugin: &'static str },
}

/// Runs `plugin` on its own task so that a panic stays local to it.
pub async fn run_supervised(
    plugin: Arc<dyn Plugin>,
    event: Arc<Event>,
    ctx: PluginContext,
) -> std::result::Result<(), PluginFailure> {
    let name = plugin.name();
    let handle = tokio::spawn(async move { plugin.handle(&event, &ctx).await });
    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(PluginFailure::Failed {
            plugin: name,
            source,
        }),
        Err(e) if e.is_panic() => Err(PluginFailure::Panicked { plugin: name }),
        Err(_) => Err(PluginFailure::Cancelled { plugin: name }),
    }
}

/// Routes decoded events to every plugin registered for their kind.
#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<PluginRegistry>,
    github: Arc<dyn GitHubApi>,
    bot_name: String,
    in_flight: InFlightTasks,
    metrics: Arc<Metrics>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<PluginRegistry>,
        github: Arc<dyn GitHubApi>,
        bot_name: impl Into<String>,
        in_flight: InFlightTasks,
        metrics: Arc<Metrics>,
    ) -> Self {
        EventRouter {
            registry,
            github,
            bot_name: bot_name.into(),
            in_flight,
            metrics,
        }
    }

    pub fn in_flight(&self) -> &InFlightTasks {
        &self.in_flight
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Decodes `payload` and spawns one task per matching plugin without
    /// waiting for them. Returns how many plugins were started.
    ///
    /// Unknown event types are dropped.
    #[instrument(skip(self, delivery_id, payload), fields(delivery_id = %delivery_id))]
    pub fn dispatch(
        &self,
        event_type: &str,
        delivery_id: &DeliveryId,
        payload: &[u8],
    ) -> Result<usize> {
        let Some(event) = parse_webhook(event_type, payload)? else {
            debug!("Ignoring unsupported event type");
            return Ok(0);
        };

        let plugins = self.registry.plugins_for(event.kind());
        if plugins.is_empty() {
            debug!(kind = %event.kind(), "No plugin handles this event kind");
            return Ok(0);
        }

        debug!(
            repo = %event.repo(),
            actor = event.actor(),
            plugins = plugins.len(),
            "Dispatching event"
        );

        let event = Arc::new(event);
        let ctx = PluginContext {
            github: self.github.clone(),
            bot_name: self.bot_name.clone(),
            delivery_id: delivery_id.clone(),
        };
        for plugin in &plugins {
            self.spawn_plugin(plugin.clone(), event.clone(), ctx.clone());
        }
        Ok(plugins.len())
    }

    fn spawn_plugin(&self, plugin: Arc<dyn Plugin>, event: Arc<Event>, ctx: PluginContext) {
        let metrics = self.metrics.clone();
        let name = plugin.name();
        let span = info_span!("plugin", plugin = name, delivery_id = %ctx.delivery_id);
        self.in_flight.spawn(
            async move {
                if let Err(failure) = run_supervised(plugin, event, ctx).await {
                    metrics.record_plugin_failure(name);
                    error!(error = %failure, "Plugin invocation failed");
                }
            }
            .instrument(span),
        );
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("registry", &self.registry)
            .field("bot_name", &self.bot_name)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
