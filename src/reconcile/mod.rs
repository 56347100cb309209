//! Idempotent reconciliation of requested changes against remote state.
//!
//! Shared by every plugin that edits a set-valued attribute (labels, entity
//! collaborators): the plugin parses a [`Delta`], re-reads the current value
//! and the universe of permitted values, and applies the [`Reconciliation`].

mod authz;
mod engine;

pub use authz::is_author_or_privileged;
pub use engine::{Delta, Miss, MissReason, Reconciliation, reconcile};
