//! The author-or-privileged gate used before state-changing commands.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Returns true if `actor` authored the entity or holds an elevated role.
///
/// `has_elevated_role` is only consulted when the actor is not the author.
/// A failed lookup counts as "not privileged" and is logged; the caller then
/// refuses the operation rather than failing the whole event.
pub async fn is_author_or_privileged<F, Fut, E>(
    author: &str,
    actor: &str,
    has_elevated_role: F,
) -> bool
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Display,
{
    if actor.eq_ignore_ascii_case(author) {
        return true;
    }
    match has_elevated_role(actor.to_string()).await {
        Ok(privileged) => privileged,
        Err(e) => {
            warn!(actor = %actor, error = %e, "Role lookup failed; treating as unprivileged");
            false
        }
    }
}
