//! ChatOps hook - slash-command plugins for GitHub repositories.
//!
//! Webhooks are validated and acknowledged by the [`server`], decoded and
//! fanned out by [`dispatch`], and acted on by the [`plugins`] through the
//! [`github`] API. The shared building blocks are the [`commands`] parser,
//! the [`reconcile`] engine and the approver suggestions in [`owners`].

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod github;
pub mod metrics;
pub mod owners;
pub mod plugins;
pub mod reconcile;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;
