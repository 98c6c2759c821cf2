//! Least-assigned placement for new pods
//!
//! Every schedulable node carries an assignment count: the number of pods
//! currently placed on it. The candidate for the next pod is the node with
//! the smallest count. Ties go to the lexicographically smallest node name
//! so the same cluster state always yields the same choice.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::controller::ControllerError;

/// Pick the node that should receive the next pod.
///
/// Single pass over the counts. Fails with `NoSchedulableNodes` when there is
/// nothing to choose from.
pub fn select_candidate(assignments: &BTreeMap<String, u32>) -> Result<String, ControllerError> {
    assignments
        .iter()
        .min_by(|a, b| compare_candidates(a, b))
        .map(|(name, _)| name.clone())
        .ok_or(ControllerError::NoSchedulableNodes)
}

/// Order two `(name, count)` entries by preference, best first.
///
/// `Ordering::Less` means `a` should be picked before `b`.
pub fn compare_candidates(a: &(&String, &u32), b: &(&String, &u32)) -> Ordering {
    a.1.cmp(b.1).then_with(|| a.0.cmp(b.0))
}

/// Spread between the most and least loaded node, or `None` when empty
pub fn load_spread(assignments: &BTreeMap<String, u32>) -> Option<u32> {
    let min = assignments.values().min()?;
    let max = assignments.values().max()?;
    Some(max - min)
}
