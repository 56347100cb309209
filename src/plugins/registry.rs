//! The set of plugins active in this process.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::webhooks::EventKind;

use super::{Plugin, PluginHelp};

/// Startup errors from building a registry. Any of these aborts the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("plugin {0:?} is already registered")]
    DuplicateName(String),

    #[error("plugin {0:?} does not handle any event kind")]
    NoEventKinds(String),

    #[error("plugin {name:?} lists event kind {kind} more than once")]
    DuplicateEventKind { name: String, kind: EventKind },
}

/// Registered plugins in registration order.
///
/// Built once in `main` and shared read-only with the router afterwards.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        let name = plugin.name();
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let kinds = plugin.event_kinds();
        if kinds.is_empty() {
            return Err(RegistryError::NoEventKinds(name.to_string()));
        }
        let mut seen = BTreeSet::new();
        for kind in kinds {
            if !seen.insert(*kind) {
                return Err(RegistryError::DuplicateEventKind {
                    name: name.to_string(),
                    kind: *kind,
                });
            }
        }

        self.plugins.push(plugin);
        Ok(())
    }

    /// Plugins handling `kind`, in registration order.
    pub fn plugins_for(&self, kind: EventKind) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .filter(|p| p.event_kinds().contains(&kind))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn help(&self) -> Vec<PluginHelp> {
        self.plugins.iter().map(|p| p.help()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
