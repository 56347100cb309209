//! Set reconciliation for labels and entity collaborators.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Requested additions and removals, parsed from one comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl Delta {
    pub fn new<A, R>(to_add: A, to_remove: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Delta {
            to_add: to_add.into_iter().map(Into::into).collect(),
            to_remove: to_remove.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Why a requested value was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The value to add is not in the universe of permitted values.
    NotValidTarget,
    /// The value to remove is not currently set.
    NotCurrentlySet,
    /// The value to add already holds a role that excludes this one.
    ConflictingRole,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissReason::NotValidTarget => "not a valid target",
            MissReason::NotCurrentlySet => "not currently set",
            MissReason::ConflictingRole => "holds a conflicting role",
        })
    }
}

/// A rejected value. Reported back to the user, never treated as an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Miss {
    pub value: String,
    pub reason: MissReason,
}

/// The outcome of reconciling a [`Delta`] against current remote state.
///
/// `apply` is the full target set for APIs with whole-set replacement;
/// `added`/`removed` are the individual calls for APIs without it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub apply: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub misses: Vec<Miss>,
}

impl Reconciliation {
    /// True when applying this result would not change remote state.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn misses_with(&self, reason: MissReason) -> impl Iterator<Item = &str> {
        self.misses
            .iter()
            .filter(move |m| m.reason == reason)
            .map(|m| m.value.as_str())
    }
}

/// Reconciles `delta` against `current` within `universe`.
///
/// Per requested value:
///
/// - an addition equal to `conflicting` is a [`MissReason::ConflictingRole`]
///   miss (checked first)
/// - an addition already in `current` is a silent no-op
/// - an addition outside `universe` is a [`MissReason::NotValidTarget`] miss
/// - a removal not in `current` is a [`MissReason::NotCurrentlySet`] miss
///
/// `apply = (current - valid removals) + valid additions`. The result depends
/// only on the input sets, never on iteration or request order.
///
/// ```
/// use std::collections::BTreeSet;
/// use chatops_hook::reconcile::{reconcile, Delta, MissReason};
///
/// let set = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
///
/// let result = reconcile(
///     &set(&["kind/bug"]),
///     &Delta::new(["kind/feature", "kind/nonexistent"], ["kind/bug"]),
///     &set(&["kind/bug", "kind/feature"]),
///     None,
/// );
/// assert_eq!(result.apply, set(&["kind/feature"]));
/// assert_eq!(result.misses_with(MissReason::NotValidTarget).collect::<Vec<_>>(), ["kind/nonexistent"]);
/// ```
pub fn reconcile(
    current: &BTreeSet<String>,
    delta: &Delta,
    universe: &BTreeSet<String>,
    conflicting: Option<&str>,
) -> Reconciliation {
    let mut misses = Vec::new();
    let mut added = BTreeSet::new();
    let mut removed = BTreeSet::new();

    for value in &delta.to_add {
        if conflicting == Some(value.as_str()) {
            misses.push(Miss {
                value: value.clone(),
                reason: MissReason::ConflictingRole,
            });
        } else if current.contains(value) {
            continue;
        } else if !universe.contains(value) {
            misses.push(Miss {
                value: value.clone(),
                reason: MissReason::NotValidTarget,
            });
        } else {
            added.insert(value.clone());
        }
    }

    for value in &delta.to_remove {
        if current.contains(value) {
            removed.insert(value.clone());
        } else {
            misses.push(Miss {
                value: value.clone(),
                reason: MissReason::NotCurrentlySet,
            });
        }
    }

    let apply = current
        .difference(&removed)
        .chain(added.iter())
        .cloned()
        .collect();
    misses.sort();

    Reconciliation {
        apply,
        added,
        removed,
        misses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_and_remove_labels() {
        // /kind feature + /remove-kind bug on an issue labelled kind/bug
        let result = reconcile(
            &set(&["kind/bug"]),
            &Delta::new(["kind/feature"], ["kind/bug"]),
            &set(&["kind/bug", "kind/feature"]),
            None,
        );
        assert_eq!(result.apply, set(&["kind/feature"]));
        assert_eq!(result.added, set(&["kind/feature"]));
        assert_eq!(result.removed, set(&["kind/bug"]));
        assert!(result.misses.is_empty());
    }

    #[test]
    fn adding_value_outside_universe_misses() {
        let result = reconcile(
            &BTreeSet::new(),
            &Delta::new(["kind/nonexistent"], Vec::<String>::new()),
            &set(&["kind/bug"]),
            None,
        );
        assert!(result.apply.is_empty());
        assert!(result.is_noop());
        assert_eq!(
            result.misses,
            vec![Miss {
                value: "kind/nonexistent".to_string(),
                reason: MissReason::NotValidTarget,
            }]
        );
    }

    #[test]
    fn adding_existing_value_is_silent() {
        let result = reconcile(
            &set(&["kind/bug"]),
            &Delta::new(["kind/bug"], Vec::<String>::new()),
            &set(&["kind/bug"]),
            None,
        );
        assert!(result.is_noop());
        assert!(result.misses.is_empty());
        assert_eq!(result.apply, set(&["kind/bug"]));
    }

    #[test]
    fn removing_unset_value_misses() {
        let result = reconcile(
            &set(&["kind/bug"]),
            &Delta::new(Vec::<String>::new(), ["kind/feature"]),
            &set(&["kind/bug", "kind/feature"]),
            None,
        );
        assert_eq!(result.apply, set(&["kind/bug"]));
        assert_eq!(
            result.misses_with(MissReason::NotCurrentlySet).collect::<Vec<_>>(),
            vec!["kind/feature"]
        );
    }

    #[test]
    fn conflicting_role_checked_before_membership() {
        // The author cannot be added as a collaborator, even if already one.
        let result = reconcile(
            &set(&["alice"]),
            &Delta::new(["alice", "bob"], Vec::<String>::new()),
            &set(&["alice", "bob"]),
            Some("alice"),
        );
        assert_eq!(result.added, set(&["bob"]));
        assert_eq!(
            result.misses,
            vec![Miss {
                value: "alice".to_string(),
                reason: MissReason::ConflictingRole,
            }]
        );
    }

    #[test]
    fn value_in_both_add_and_remove_follows_set_formula() {
        let result = reconcile(
            &set(&["x"]),
            &Delta::new(["x", "y"], ["x", "y"]),
            &set(&["x", "y"]),
            None,
        );
        // x: add is a no-op, remove is valid. y: add is valid, remove misses.
        assert_eq!(result.apply, set(&["y"]));
        assert_eq!(result.removed, set(&["x"]));
        assert_eq!(result.added, set(&["y"]));
        assert_eq!(
            result.misses_with(MissReason::NotCurrentlySet).collect::<Vec<_>>(),
            vec!["y"]
        );
    }

    #[test]
    fn adding_present_and_new_labels_together() {
        let result = reconcile(
            &set(&["kind/bug"]),
            &Delta::new(["kind/bug", "priority/high"], Vec::<String>::new()),
            &set(&["kind/bug", "priority/high", "sig/api"]),
            None,
        );
        assert_eq!(result.apply, set(&["kind/bug", "priority/high"]));
        assert_eq!(result.added, set(&["priority/high"]));
        assert!(result.removed.is_empty());
        assert!(result.misses.is_empty());
    }

    #[test]
    fn removing_label_that_is_not_set_is_one_miss() {
        let result = reconcile(
            &set(&["kind/bug"]),
            &Delta::new(Vec::<String>::new(), ["sig/api"]),
            &set(&["kind/bug", "priority/high", "sig/api"]),
            None,
        );
        assert!(result.is_noop());
        assert_eq!(result.apply, set(&["kind/bug"]));
        assert_eq!(
            result.misses,
            vec![Miss {
                value: "sig/api".to_string(),
                reason: MissReason::NotCurrentlySet,
            }]
        );
    }

    fn arb_set() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-e]", 0..5)
    }

    proptest! {
        /// Re-running with the applied set as current changes nothing.
        #[test]
        fn rerun_is_idempotent(
            current in arb_set(),
            adds in arb_set(),
            removes in arb_set(),
            universe in arb_set(),
            conflicting in prop::option::of("[a-e]"),
        ) {
            // A value both added and removed in one comment converges only
            // after the second run; see `value_in_both_add_and_remove_follows_set_formula`.
            let removes: BTreeSet<_> = removes.difference(&adds).cloned().collect();
            let delta = Delta { to_add: adds, to_remove: removes };
            let first = reconcile(&current, &delta, &universe, conflicting.as_deref());
            let second = reconcile(&first.apply, &delta, &universe, conflicting.as_deref());

            prop_assert!(second.is_noop());
            prop_assert_eq!(&second.apply, &first.apply);
            for miss in &second.misses {
                let repeated = first.misses.contains(miss);
                let removed_last_time = miss.reason == MissReason::NotCurrentlySet
                    && first.removed.contains(&miss.value);
                prop_assert!(repeated || removed_last_time, "unexpected miss {:?}", miss);
            }
        }

        #[test]
        fn apply_matches_set_formula(
            current in arb_set(),
            adds in arb_set(),
            removes in arb_set(),
            universe in arb_set(),
        ) {
            let delta = Delta { to_add: adds, to_remove: removes };
            let result = reconcile(&current, &delta, &universe, None);

            let valid_removes: BTreeSet<_> = delta.to_remove.intersection(&current).cloned().collect();
            let valid_adds: BTreeSet<_> = delta
                .to_add
                .iter()
                .filter(|v| universe.contains(*v) && !current.contains(*v))
                .cloned()
                .collect();
            let expected: BTreeSet<_> = current
                .difference(&valid_removes)
                .chain(valid_adds.iter())
                .cloned()
                .collect();
            prop_assert_eq!(result.apply, expected);
        }

        /// Applied values always come from current or the universe.
        #[test]
        fn apply_stays_within_current_and_universe(
            current in arb_set(),
            adds in arb_set(),
            removes in arb_set(),
            universe in arb_set(),
        ) {
            let delta = Delta { to_add: adds, to_remove: removes };
            let result = reconcile(&current, &delta, &universe, None);
            for value in &result.apply {
                prop_assert!(current.contains(value) || universe.contains(value));
            }
        }
    }
}
