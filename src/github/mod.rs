//! GitHub REST access for plugins.
//!
//! - [`GitHubApi`]: the operations plugins may perform
//! - [`OctocrabClient`]: the production implementation
//! - [`GitHubApiError`]: failures, classified transient or permanent

mod api;
mod client;
mod error;

pub use api::{ApiResult, GitHubApi, IssueComment, MergeMethod, Permission};
pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
