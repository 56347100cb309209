//! GitHub API error type.
//!
//! Nothing in this crate retries, but the transient/permanent split is still
//! logged so an operator can tell a GitHub outage from a configuration problem
//! (and knows whether asking GitHub to redeliver is worthwhile).

use std::fmt;
use thiserror::Error;

/// Coarse classification of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// HTTP 5xx, 429, secondary rate limits, network failures.
    Transient,
    /// Everything else: missing permissions, unknown resources, validation failures.
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A failed GitHub API call.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if the request got that far.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// An error with a known status code and no underlying octocrab error.
    pub fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: kind_for_status(status_code, ""),
            status_code: Some(status_code),
            message: message.into(),
            source: None,
        }
    }

    /// A permanent error without an HTTP status (e.g. an unexpected response body).
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let (status_code, message) = match &err {
            octocrab::Error::GitHub { source, .. } => {
                (Some(source.status_code.as_u16()), source.message.clone())
            }
            other => (None, other.to_string()),
        };

        let kind = match status_code {
            Some(code) => kind_for_status(code, &message),
            None if is_network_error(&message) => GitHubErrorKind::Transient,
            None => GitHubErrorKind::Permanent,
        };

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

fn kind_for_status(code: u16, message: &str) -> GitHubErrorKind {
    match code {
        429 => GitHubErrorKind::Transient,
        403 if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        500..=599 => GitHubErrorKind::Transient,
        _ => GitHubErrorKind::Permanent,
    }
}

fn is_rate_limit_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("rate limit") || message.contains("abuse detection")
}

fn is_network_error(message: &str) -> bool {
    let message = message.to_lowercase();
    ["timeout", "timed out", "connection", "dns"]
        .iter()
        .any(|needle| message.contains(needle))
}
