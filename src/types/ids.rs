//! Newtype wrappers for identifiers carried by webhook events.
//!
//! Issue and pull-request numbers share one sequence per repository, so a
//! single [`IssueNumber`] addresses either kind of entity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An issue or pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueNumber(pub u64);

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for IssueNumber {
    fn from(n: u64) -> Self {
        IssueNumber(n)
    }
}

/// A repository identifier (owner/repo format).
///
/// `owner` is the organisation or user that owns the repository; repo-scoped
/// configuration resolves against both the owner alone and the full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Returns the `owner/repo` form used in configuration files.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A GitHub webhook delivery ID (the `X-GitHub-Delivery` GUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(s: impl Into<String>) -> Self {
        DeliveryId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeliveryId {
    fn from(s: String) -> Self {
        DeliveryId(s)
    }
}

/// A GitHub comment ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommentId {
    fn from(n: u64) -> Self {
        CommentId(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn issue_number_displays_with_hash() {
        assert_eq!(IssueNumber(42).to_string(), "#42");
    }

    #[test]
    fn repo_id_full_name() {
        let repo = RepoId::new("acme", "widgets");
        assert_eq!(repo.full_name(), "acme/widgets");
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn delivery_id_serializes_transparently() {
        let id = DeliveryId::new("72d3162e-cc78-11e3-81ab-4c9367dc0958");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"72d3162e-cc78-11e3-81ab-4c9367dc0958\"");
    }

    #[test]
    fn comment_id_deserializes_from_number() {
        let id: CommentId = serde_json::from_str("1234").unwrap();
        assert_eq!(id, CommentId(1234));
    }

    proptest! {
        #[test]
        fn repo_ids_order_by_owner_first(a in "[a-z]{1,8}", b in "[a-z]{1,8}", r in "[a-z]{1,8}") {
            let left = RepoId::new(a.clone(), r.clone());
            let right = RepoId::new(b.clone(), r);
            prop_assert_eq!(left.cmp(&right), a.cmp(&b));
        }
    }
}
