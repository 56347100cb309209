//! Greedy approver suggestion.
//!
//! Given the files a change touches, find a small set of people who between
//! them can approve every ownership directory involved. Exact set cover is
//! NP-hard; the greedy pick of "whoever covers the most remaining directories"
//! is what we ship.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::index::{OwnersIndex, canonicalize, parent};

/// The ownership directories whose approval a change needs.
///
/// Each file maps to its nearest declaring directory; a directory is then
/// dropped when an ancestor is also in the set, unless a `no_parent_owners`
/// directory sits between them (the subdirectory itself included).
pub fn owners_dirs<S: AsRef<str>>(index: &OwnersIndex, changed_files: &[S]) -> BTreeSet<String> {
    let dirs: BTreeSet<String> = changed_files
        .iter()
        .map(|f| index.find_approver_owners_for_file(f.as_ref()))
        .collect();

    dirs.iter()
        .filter(|dir| !covered_by_ancestor(index, dir, &dirs))
        .cloned()
        .collect()
}

fn covered_by_ancestor(index: &OwnersIndex, dir: &str, dirs: &BTreeSet<String>) -> bool {
    let mut path = canonicalize(dir);
    loop {
        if index.is_no_parent_owners(path) {
            return false;
        }
        match parent(path) {
            Some(up) if dirs.contains(up) => return true,
            Some(up) => path = up,
            None => return false,
        }
    }
}

/// Every leaf approver of `dirs`, sorted then permuted by `seed`.
///
/// The same seed always yields the same order, so a pull request gets stable
/// suggestions across re-runs while different pull requests spread the load.
pub fn shuffled_approvers(index: &OwnersIndex, dirs: &BTreeSet<String>, seed: u64) -> Vec<String> {
    let mut approvers: Vec<String> = dirs
        .iter()
        .flat_map(|dir| index.leaf_approvers(dir))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if approvers.is_empty() {
        debug!("No potential approvers; no ownership declarations cover the change");
    }
    approvers.shuffle(&mut StdRng::seed_from_u64(seed));
    approvers
}

/// Suggests approvers so that, together with `known_approvers`, every
/// ownership directory touched by `changed_files` is approved.
///
/// A directory counts as approved once anyone in its effective (inherited)
/// approver set is chosen. Candidates are scored by how many still-unapproved
/// directories their *leaf* declarations cover; ties go to the candidate
/// listed first (known approvers in sorted order, then the seeded shuffle).
/// When no candidate covers anything the partial result is returned.
///
/// The result holds only the new picks, not `known_approvers`.
pub fn suggest<S: AsRef<str>>(
    changed_files: &[S],
    index: &OwnersIndex,
    known_approvers: &BTreeSet<String>,
    seed: u64,
) -> BTreeSet<String> {
    let dirs = owners_dirs(index, changed_files);

    let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for dir in &dirs {
        for approver in index.leaf_approvers(dir) {
            reverse.entry(approver).or_default().insert(dir.clone());
        }
    }

    let mut candidates: Vec<String> = known_approvers.iter().cloned().collect();
    for approver in shuffled_approvers(index, &dirs, seed) {
        if !known_approvers.contains(&approver) {
            candidates.push(approver);
        }
    }

    let effective: BTreeMap<&String, BTreeSet<String>> =
        dirs.iter().map(|d| (d, index.approvers(d))).collect();
    let mut chosen = known_approvers.clone();
    let mut picks = BTreeSet::new();

    loop {
        let unapproved: BTreeSet<&String> = effective
            .iter()
            .filter(|(_, approvers)| approvers.is_disjoint(&chosen))
            .map(|(dir, _)| *dir)
            .collect();
        if unapproved.is_empty() {
            break;
        }

        let best = most_covering(&candidates, &reverse, &unapproved);
        let Some(best) = best else {
            warn!(
                unapproved = ?unapproved,
                "Could not find approvers for every directory; returning partial suggestion"
            );
            break;
        };
        chosen.insert(best.clone());
        picks.insert(best);
    }

    picks
}

/// The first candidate with the largest non-zero coverage of `unapproved`.
fn most_covering(
    candidates: &[String],
    reverse: &BTreeMap<String, BTreeSet<String>>,
    unapproved: &BTreeSet<&String>,
) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for candidate in candidates {
        let covered = reverse
            .get(candidate)
            .map_or(0, |dirs| dirs.iter().filter(|d| unapproved.contains(d)).count());
        if covered > best.map_or(0, |(_, n)| n) {
            best = Some((candidate, covered));
        }
    }
    best.map(|(c, _)| c.clone())
}
