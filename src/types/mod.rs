//! Core domain types shared by the webhook, plugin and API layers.

pub mod entity;
pub mod ids;

pub use entity::{Entity, EntityKind, EntityState};
pub use ids::{CommentId, DeliveryId, IssueNumber, RepoId};
