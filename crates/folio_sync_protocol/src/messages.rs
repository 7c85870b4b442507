//! Annotation-sync and account wire messages.

use crate::annotation::Annotation;
use crate::tombstone::TombstoneSet;
use serde::{Deserialize, Serialize};

/// Body of an annotation push: the replica's full set plus its pending
/// deletions, against the version it last saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUpsert {
    /// The document's complete local annotation list.
    pub annotations: Vec<Annotation>,
    /// Deletion identifiers not yet acknowledged by the store.
    #[serde(default)]
    pub deleted: Vec<String>,
    /// The remote version this push was computed against; the store may
    /// refuse a stale base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
}

/// Acknowledgement of an annotation push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUpsertAck {
    /// The store's new version after applying the push.
    #[serde(default)]
    pub version: u64,
    /// Server receive time, Unix seconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// The remote store's full annotation state for one document.
///
/// Missing fields decode to their defaults (absent `version` reads as
/// 0) rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    /// Monotonically non-decreasing store version.
    #[serde(default)]
    pub version: u64,
    /// The store's annotation list.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Deletion identifiers the store has accumulated.
    #[serde(default)]
    pub deleted: Vec<String>,
    /// Last modification time, Unix seconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl AnnotationSnapshot {
    /// The no-op signal: an unchanged version with zero returned
    /// annotations means the pull has nothing to do.
    pub fn is_unchanged(&self, last_seen_version: u64) -> bool {
        self.version == last_seen_version && self.annotations.is_empty()
    }

    /// The store's deletions as a set.
    pub fn deleted_set(&self) -> TombstoneSet {
        self.deleted.iter().map(String::as_str).collect()
    }
}

/// Body of an account registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account name.
    pub username: String,
    /// Derived secret (never the raw password).
    pub password: String,
}

/// Acknowledgement of an account registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterAck {
    /// Echo of the account name.
    #[serde(default)]
    pub username: String,
}

/// Response to a credential check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthAck {
    /// `"OK"` when the credentials were accepted.
    #[serde(default)]
    pub authorized: String,
}
