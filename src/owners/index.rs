//! Directory-scoped approver declarations.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// What one directory's OWNERS declaration says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnersEntry {
    #[serde(default)]
    pub approvers: BTreeSet<String>,
    /// Stop inheriting approvers from parent directories.
    #[serde(default)]
    pub no_parent_owners: bool,
}

/// Maps repository directories to their declared approvers.
///
/// Directories are `/`-separated paths relative to the repository root; the
/// root itself is the empty string (`.` and surrounding slashes are accepted
/// on input and canonicalised away).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnersIndex {
    dirs: BTreeMap<String, OwnersEntry>,
}

impl OwnersIndex {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, OwnersEntry)>,
        S: AsRef<str>,
    {
        OwnersIndex {
            dirs: entries
                .into_iter()
                .map(|(dir, entry)| (canonicalize(dir.as_ref()).to_string(), entry))
                .collect(),
        }
    }

    /// Approvers declared directly in `dir`.
    pub fn leaf_approvers(&self, dir: &str) -> BTreeSet<String> {
        self.dirs
            .get(canonicalize(dir))
            .map(|e| e.approvers.clone())
            .unwrap_or_default()
    }

    /// Approvers effective for `dir`: its own plus every ancestor's, up to
    /// and including the first directory that sets `no_parent_owners`.
    pub fn approvers(&self, dir: &str) -> BTreeSet<String> {
        let mut approvers = BTreeSet::new();
        let mut current = Some(canonicalize(dir));
        while let Some(path) = current {
            if let Some(entry) = self.dirs.get(path) {
                approvers.extend(entry.approvers.iter().cloned());
                if entry.no_parent_owners {
                    break;
                }
            }
            current = parent(path);
        }
        approvers
    }

    pub fn is_no_parent_owners(&self, dir: &str) -> bool {
        self.dirs
            .get(canonicalize(dir))
            .is_some_and(|e| e.no_parent_owners)
    }

    /// The nearest directory at or above `file` that declares approvers.
    ///
    /// Falls back to the root when nothing on the path does.
    pub fn find_approver_owners_for_file(&self, file: &str) -> String {
        let mut current = Some(canonicalize(file));
        while let Some(path) = current {
            if self.dirs.get(path).is_some_and(|e| !e.approvers.is_empty()) {
                return path.to_string();
            }
            current = parent(path);
        }
        String::new()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.values().all(|e| e.approvers.is_empty())
    }
}

/// `"."` and `"/a/b/"` become `""` and `"a/b"`.
pub(crate) fn canonicalize(path: &str) -> &str {
    let trimmed = path.trim_matches('/');
    if trimmed == "." { "" } else { trimmed }
}

/// Parent directory; `None` once at the root.
pub(crate) fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map_or("", |(dir, _)| dir))
}
