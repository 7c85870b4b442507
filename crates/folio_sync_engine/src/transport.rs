//! Transport layer abstraction for the remote store.

use crate::error::{SyncError, SyncResult};
use folio_sync_protocol::{
    AnnotationSnapshot, AnnotationUpsert, AnnotationUpsertAck, ProgressRecord, ProgressUpdate,
    ProgressUpdateAck,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The remote store's operations, independent of transport encoding.
///
/// Every call is authenticated individually (username plus derived
/// secret); there are no session tokens. Implementations decide the
/// actual encoding — see `JsonTransport` for the HTTP/JSON one and
/// [`MockTransport`] for tests.
pub trait SyncTransport: Send + Sync {
    /// Creates the account on the remote store.
    fn register(&self, username: &str, secret: &str) -> SyncResult<()>;

    /// Validates the stored credentials.
    fn authenticate(&self) -> SyncResult<()>;

    /// Uploads a progress record.
    fn put_progress(&self, update: &ProgressUpdate) -> SyncResult<ProgressUpdateAck>;

    /// Fetches the latest progress record for a document, if any.
    fn get_progress(&self, document: &str) -> SyncResult<Option<ProgressRecord>>;

    /// Uploads the annotation set and pending deletions.
    fn put_annotations(
        &self,
        document: &str,
        upsert: &AnnotationUpsert,
    ) -> SyncResult<AnnotationUpsertAck>;

    /// Fetches the remote annotation snapshot for a document.
    fn get_annotations(&self, document: &str) -> SyncResult<AnnotationSnapshot>;

    /// Whether the transport currently has a usable connection.
    fn is_connected(&self) -> bool;
}

/// A scripted transport for tests.
///
/// Behaves as a tiny single-document server: annotation pushes bump a
/// version counter and are recorded; snapshot and progress responses
/// are whatever the test seeds. A failure message or auth rejection,
/// once set, applies to every call until cleared.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: AtomicBool,
    reject_auth: AtomicBool,
    failure: Mutex<Option<String>>,
    version: AtomicU64,
    snapshot: Mutex<AnnotationSnapshot>,
    progress: Mutex<Option<ProgressRecord>>,
    annotation_pulls: AtomicU64,
    pushed_upserts: Mutex<Vec<AnnotationUpsert>>,
    pushed_progress: Mutex<Vec<ProgressUpdate>>,
}

impl MockTransport {
    /// Creates a connected mock with an empty store.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes every call fail with a retryable transport error, or
    /// clears the failure with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(String::from);
    }

    /// Makes every call fail with an authentication rejection.
    pub fn set_reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    /// Seeds the annotation snapshot returned by pulls.
    pub fn set_snapshot(&self, snapshot: AnnotationSnapshot) {
        self.version.store(snapshot.version, Ordering::SeqCst);
        *self.snapshot.lock() = snapshot;
    }

    /// Seeds the progress record returned by pulls.
    pub fn set_progress_record(&self, record: Option<ProgressRecord>) {
        *self.progress.lock() = record;
    }

    /// Annotation upserts received so far.
    pub fn pushed_upserts(&self) -> Vec<AnnotationUpsert> {
        self.pushed_upserts.lock().clone()
    }

    /// Number of annotation pushes received.
    pub fn annotation_push_count(&self) -> usize {
        self.pushed_upserts.lock().len()
    }

    /// Number of annotation pulls served.
    pub fn annotation_pull_count(&self) -> u64 {
        self.annotation_pulls.load(Ordering::SeqCst)
    }

    /// Progress uploads received so far.
    pub fn pushed_progress(&self) -> Vec<ProgressUpdate> {
        self.pushed_progress.lock().clone()
    }

    /// The mock store's current version counter.
    pub fn server_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn check(&self) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        if let Some(message) = self.failure.lock().clone() {
            return Err(SyncError::transport_retryable(message));
        }
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(SyncError::AuthRejected("bad credentials".into()));
        }
        Ok(())
    }
}

impl SyncTransport for MockTransport {
    fn register(&self, _username: &str, _secret: &str) -> SyncResult<()> {
        self.check()
    }

    fn authenticate(&self) -> SyncResult<()> {
        self.check()
    }

    fn put_progress(&self, update: &ProgressUpdate) -> SyncResult<ProgressUpdateAck> {
        self.check()?;
        self.pushed_progress.lock().push(update.clone());
        Ok(ProgressUpdateAck {
            document: update.document.clone(),
            timestamp: 0,
        })
    }

    fn get_progress(&self, _document: &str) -> SyncResult<Option<ProgressRecord>> {
        self.check()?;
        Ok(self.progress.lock().clone())
    }

    fn put_annotations(
        &self,
        _document: &str,
        upsert: &AnnotationUpsert,
    ) -> SyncResult<AnnotationUpsertAck> {
        self.check()?;
        self.pushed_upserts.lock().push(upsert.clone());
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AnnotationUpsertAck {
            version,
            timestamp: 0,
        })
    }

    fn get_annotations(&self, _document: &str) -> SyncResult<AnnotationSnapshot> {
        self.check()?;
        self.annotation_pulls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.lock().clone())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
