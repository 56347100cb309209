//! Ownership declarations and approver suggestion for changed files.

mod index;
mod suggest;

pub use index::{OwnersEntry, OwnersIndex};
pub use suggest::{owners_dirs, shuffled_approvers, suggest};
