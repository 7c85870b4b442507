//! The two-set annotation merge.

use crate::annotation::{Annotation, PositionKey};
use crate::tombstone::TombstoneSet;
use std::collections::HashMap;

/// Reconciles a replica's local annotation set with a remote snapshot.
///
/// Pure and total: no I/O, no state beyond the inputs, cannot fail.
/// Runs in O(n + m).
///
/// Rules, in order of precedence:
/// - an identifier in `remote_tombstones` removes the local copy
///   regardless of timestamps (a remote deletion wins over any local
///   edit);
/// - when both sides hold the same [`PositionKey`], the greater
///   effective timestamp wins; an exact tie keeps the local copy;
/// - a remote-only annotation is adopted unless its identifier is in
///   `local_tombstones` (a deletion recorded here but not yet
///   acknowledged by the server must not be resurrected by a pull that
///   raced ahead of the push).
///
/// Output order is local survivors followed by remote survivors; callers
/// re-sort for display.
pub fn merge(
    local: &[Annotation],
    remote: &[Annotation],
    remote_tombstones: &TombstoneSet,
    local_tombstones: &TombstoneSet,
) -> Vec<Annotation> {
    let mut remote_by_key: HashMap<PositionKey, usize> = HashMap::with_capacity(remote.len());
    for (idx, ann) in remote.iter().enumerate() {
        remote_by_key.insert(ann.position_key(), idx);
    }
    let mut consumed = vec![false; remote.len()];

    let mut out = Vec::with_capacity(local.len() + remote.len());

    for ours in local {
        if remote_tombstones.contains(ours.id()) {
            continue;
        }
        match remote_by_key.get(&ours.position_key()) {
            Some(&idx) => {
                consumed[idx] = true;
                let theirs = &remote[idx];
                if theirs.effective_timestamp() > ours.effective_timestamp() {
                    out.push(theirs.clone());
                } else {
                    out.push(ours.clone());
                }
            }
            None => out.push(ours.clone()),
        }
    }

    for (idx, theirs) in remote.iter().enumerate() {
        if consumed[idx] || local_tombstones.contains(theirs.id()) {
            continue;
        }
        out.push(theirs.clone());
    }

    out
}
