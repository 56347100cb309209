//! Per-repository plugin configuration.
//!
//! Every plugin section of the config file is a list of entries scoped by
//! `repos` (each `org` or `org/repo`) and `excluded_repos` (each `org/repo`):
//!
//! ```yaml
//! tide:
//!   - repos: [acme]
//!     excluded_repos: [acme/legacy]
//!     labels: [lgtm]
//!   - repos: [acme/widgets]
//!     labels: [lgtm, approved]
//! ```

use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;

use crate::types::RepoId;

use super::approvers::ApproversConfig;
use super::assign::AssignConfig;
use super::associate::AssociateConfig;
use super::label::LabelConfig;
use super::lifecycle::LifecycleConfig;
use super::tide::TideConfig;

/// Problems with one scoped entry, found at load time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("entry {index} has no repos")]
    EmptyRepos { index: usize },

    #[error("entry {index} lists {overlap:?} in both repos and excluded_repos")]
    Overlap { index: usize, overlap: Vec<String> },
}

/// One configuration entry together with the repositories it covers.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoScoped<T> {
    pub repos: BTreeSet<String>,
    #[serde(default)]
    pub excluded_repos: BTreeSet<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// An ordered list of [`RepoScoped`] entries for one plugin.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RepoScopedConfig<T> {
    entries: Vec<RepoScoped<T>>,
}

impl<T> Default for RepoScopedConfig<T> {
    fn default() -> Self {
        RepoScopedConfig {
            entries: Vec::new(),
        }
    }
}

impl<T> RepoScopedConfig<T> {
    pub fn new(entries: Vec<RepoScoped<T>>) -> Self {
        RepoScopedConfig { entries }
    }

    /// Finds the payload that applies to `repo`.
    ///
    /// The first entry naming `org/repo` exactly wins. Failing that, the
    /// *last* entry naming the org applies, unless it excludes `org/repo`,
    /// in which case nothing applies.
    pub fn resolve(&self, repo: &RepoId) -> Option<&T> {
        let full_name = repo.full_name();
        if let Some(entry) = self.entries.iter().find(|e| e.repos.contains(&full_name)) {
            return Some(&entry.payload);
        }

        let entry = self
            .entries
            .iter()
            .rev()
            .find(|e| e.repos.contains(&repo.owner))?;
        if entry.excluded_repos.contains(&full_name) {
            None
        } else {
            Some(&entry.payload)
        }
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.repos.is_empty() {
                return Err(ScopeError::EmptyRepos { index });
            }
            let overlap: Vec<String> = entry
                .repos
                .intersection(&entry.excluded_repos)
                .cloned()
                .collect();
            if !overlap.is_empty() {
                return Err(ScopeError::Overlap { index, overlap });
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[RepoScoped<T>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The whole plugin configuration file. A missing section leaves that
/// plugin inactive everywhere.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginsConfig {
    pub label: RepoScopedConfig<LabelConfig>,
    pub assign: RepoScopedConfig<AssignConfig>,
    pub lifecycle: RepoScopedConfig<LifecycleConfig>,
    pub tide: RepoScopedConfig<TideConfig>,
    pub approvers: RepoScopedConfig<ApproversConfig>,
    pub associate: RepoScopedConfig<AssociateConfig>,
}

impl PluginsConfig {
    /// Validates every section, naming the first one that fails.
    pub fn validate(&self) -> Result<(), (&'static str, ScopeError)> {
        self.label.validate().map_err(|e| ("label", e))?;
        self.assign.validate().map_err(|e| ("assign", e))?;
        self.lifecycle.validate().map_err(|e| ("lifecycle", e))?;
        self.tide.validate().map_err(|e| ("tide", e))?;
        self.approvers.validate().map_err(|e| ("approvers", e))?;
        self.associate.validate().map_err(|e| ("associate", e))?;
        Ok(())
    }
}
