//! Local collaborator seams: replica storage, host UI, connectivity.

use crate::error::SyncResult;
use folio_sync_protocol::{Annotation, TombstoneSet};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};

/// Replica-local persistence consumed by the engine.
///
/// Covers the open document's annotation list and reading position,
/// plus the small amount of sync state that survives across reading
/// sessions: the last confirmed annotation version, the pending
/// tombstones, and the once-generated device identity.
pub trait ReplicaStore: Send + Sync {
    /// The document's full annotation list.
    fn annotations(&self) -> SyncResult<Vec<Annotation>>;

    /// Replaces the document's full annotation list with a merge result.
    fn replace_annotations(&self, annotations: Vec<Annotation>) -> SyncResult<()>;

    /// Current reading position and progress fraction.
    fn position(&self) -> SyncResult<(String, f64)>;

    /// Moves the reading position after a pulled progress record wins.
    fn apply_position(&self, position: &str, percentage: f64) -> SyncResult<()>;

    /// The annotation version last confirmed by the remote store.
    fn annotation_version(&self) -> SyncResult<u64>;

    /// Persists the annotation version after a confirmed exchange.
    fn set_annotation_version(&self, version: u64) -> SyncResult<()>;

    /// Tombstones pending remote acknowledgement.
    fn tombstones(&self) -> SyncResult<TombstoneSet>;

    /// Persists the tombstone set.
    fn save_tombstones(&self, tombstones: &TombstoneSet) -> SyncResult<()>;

    /// Stable device identity, generated once and reused across
    /// sessions.
    fn device_id(&self) -> SyncResult<String>;
}

/// Host UI surface, used only at the edges.
pub trait UiHandle: Send + Sync {
    /// Shows a transient message.
    fn notify(&self, text: &str);

    /// Asks a yes/no question and blocks for the answer.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Connectivity oracle.
///
/// The engine only ever asks; it never initiates a connection. Hosts
/// report connectivity transitions through the scheduler's
/// `NetworkUp`/`NetworkDown` events.
pub trait Connectivity: Send + Sync {
    /// Whether a usable connection is currently established.
    fn is_online(&self) -> bool;
}

/// An in-memory replica store for tests.
#[derive(Debug)]
pub struct MemoryReplicaStore {
    annotations: RwLock<Vec<Annotation>>,
    position: RwLock<(String, f64)>,
    version: RwLock<u64>,
    tombstones: RwLock<TombstoneSet>,
    device_id: String,
}

impl MemoryReplicaStore {
    /// Creates an empty store with a fresh device identity.
    pub fn new() -> Self {
        Self {
            annotations: RwLock::new(Vec::new()),
            position: RwLock::new((String::new(), 0.0)),
            version: RwLock::new(0),
            tombstones: RwLock::new(TombstoneSet::new()),
            device_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Seeds the annotation list.
    pub fn set_annotations(&self, annotations: Vec<Annotation>) {
        *self.annotations.write() = annotations;
    }

    /// Seeds the reading position.
    pub fn set_position(&self, position: impl Into<String>, percentage: f64) {
        *self.position.write() = (position.into(), percentage);
    }
}

impl Default for MemoryReplicaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaStore for MemoryReplicaStore {
    fn annotations(&self) -> SyncResult<Vec<Annotation>> {
        Ok(self.annotations.read().clone())
    }

    fn replace_annotations(&self, annotations: Vec<Annotation>) -> SyncResult<()> {
        *self.annotations.write() = annotations;
        Ok(())
    }

    fn position(&self) -> SyncResult<(String, f64)> {
        Ok(self.position.read().clone())
    }

    fn apply_position(&self, position: &str, percentage: f64) -> SyncResult<()> {
        *self.position.write() = (position.to_string(), percentage);
        Ok(())
    }

    fn annotation_version(&self) -> SyncResult<u64> {
        Ok(*self.version.read())
    }

    fn set_annotation_version(&self, version: u64) -> SyncResult<()> {
        *self.version.write() = version;
        Ok(())
    }

    fn tombstones(&self) -> SyncResult<TombstoneSet> {
        Ok(self.tombstones.read().clone())
    }

    fn save_tombstones(&self, tombstones: &TombstoneSet) -> SyncResult<()> {
        *self.tombstones.write() = tombstones.clone();
        Ok(())
    }

    fn device_id(&self) -> SyncResult<String> {
        Ok(self.device_id.clone())
    }
}

/// A scripted UI for tests: records notifications, answers every
/// confirmation with a preset value.
#[derive(Debug, Default)]
pub struct ScriptedUi {
    notifications: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    confirm_answer: AtomicBool,
}

impl ScriptedUi {
    /// Creates a UI that declines every confirmation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the answer given to every confirmation prompt.
    pub fn answer_confirmations(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    /// Notifications shown so far.
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }

    /// Confirmation prompts asked so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl UiHandle for ScriptedUi {
    fn notify(&self, text: &str) {
        self.notifications.lock().push(text.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }
}

/// A connectivity oracle toggled by hand, for tests.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    /// Creates an oracle in the given state.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Flips the reported state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_sync_protocol::PageRef;

    #[test]
    fn memory_store_roundtrips() {
        let store = MemoryReplicaStore::new();

        let list = vec![Annotation::new("2024-01-15 10:30:00", PageRef::Number(3))];
        store.replace_annotations(list.clone()).unwrap();
        assert_eq!(store.annotations().unwrap(), list);

        store.set_annotation_version(9).unwrap();
        assert_eq!(store.annotation_version().unwrap(), 9);

        let mut tombstones = TombstoneSet::new();
        tombstones.record("2024-01-15 10:30:00");
        store.save_tombstones(&tombstones).unwrap();
        assert_eq!(store.tombstones().unwrap(), tombstones);
    }

    #[test]
    fn device_id_is_stable_per_store() {
        let store = MemoryReplicaStore::new();
        assert_eq!(store.device_id().unwrap(), store.device_id().unwrap());

        let other = MemoryReplicaStore::new();
        assert_ne!(store.device_id().unwrap(), other.device_id().unwrap());
    }

    #[test]
    fn scripted_ui_records_interactions() {
        let ui = ScriptedUi::new();
        ui.notify("hello");
        assert!(!ui.confirm("move?"));

        ui.answer_confirmations(true);
        assert!(ui.confirm("move now?"));

        assert_eq!(ui.notifications(), vec!["hello"]);
        assert_eq!(ui.prompts(), vec!["move?", "move now?"]);
    }
}
