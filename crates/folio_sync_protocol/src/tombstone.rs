//! Deletion markers pending acknowledgement by the remote store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifiers of locally-deleted annotations that the remote store has
/// not yet acknowledged.
///
/// Membership is idempotent: recording the same deletion twice is a
/// no-op. The set is cleared in full only after a push that carried it
/// succeeds; a failed push leaves it untouched so the same deletions
/// ride the next attempt. It survives across reading sessions through
/// the replica's settings storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TombstoneSet {
    ids: BTreeSet<String>,
}

impl TombstoneSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a deletion. Returns `true` if the identifier was not
    /// already present.
    pub fn record(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Whether the identifier has a pending deletion.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Drops every pending deletion. Called once a push carrying the
    /// set has been confirmed.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Number of pending deletions.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there are no pending deletions.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates the pending identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// The identifiers as an owned list, for the wire `deleted` field.
    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

impl FromIterator<String> for TombstoneSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for TombstoneSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(String::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_idempotent() {
        let mut set = TombstoneSet::new();
        assert!(set.record("2024-01-15 10:30:00"));
        assert!(!set.record("2024-01-15 10:30:00"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("2024-01-15 10:30:00"));
    }

    #[test]
    fn clear_drops_everything() {
        let mut set: TombstoneSet = ["t1", "t2", "t3"].into_iter().collect();
        assert_eq!(set.len(), 3);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains("t1"));
    }

    #[test]
    fn serializes_as_plain_list() {
        let set: TombstoneSet = ["b", "a"].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!(["a", "b"]));

        let back: TombstoneSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn duplicate_wire_entries_collapse() {
        let back: TombstoneSet =
            serde_json::from_value(serde_json::json!(["t1", "t1", "t2"])).unwrap();
        assert_eq!(back.len(), 2);
    }
}
