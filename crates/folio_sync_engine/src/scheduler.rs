//! Event-driven sync scheduling for one open document.
//!
//! The scheduler owns the reading session's sync state: the last
//! confirmed annotation version, the pending tombstones, the page-turn
//! counter and the debounce timer. All state is mutated inside the
//! scheduler's own calls; the host drives it with [`SyncEvent`]s and a
//! single timer armed for [`SyncScheduler::next_deadline`].

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::store::{Connectivity, ReplicaStore, UiHandle};
use crate::transport::SyncTransport;
use folio_sync_protocol::{merge, AnnotationUpsert, TombstoneSet};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// External events the scheduler reacts to.
///
/// Automatic triggers are gated by [`SyncConfig::auto_sync`]; the two
/// manual events always run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The document finished opening and is ready for a pull.
    DocumentOpened,
    /// The document is about to close; the session ends after the
    /// final push.
    DocumentClosing,
    /// The process is about to suspend.
    Suspending,
    /// The process resumed from suspension.
    Resumed,
    /// Connectivity was established.
    NetworkUp,
    /// Connectivity is about to drop.
    NetworkDown,
    /// The reading position moved.
    PageTurned {
        /// The new position, as the host renders it.
        position: String,
    },
    /// User-requested push.
    ManualPush,
    /// User-requested pull.
    ManualPull,
}

/// What initiated an operation; decides how failures surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user asked; every outcome is reported through the UI.
    Interactive,
    /// A scheduler decision; failures are swallowed and retried on the
    /// next natural trigger. Authentication failures surface anyway.
    Background,
}

/// The debounce timer, as explicit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Pending { deadline: Instant },
}

/// Which exchange holds the in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Push,
    Pull,
}

/// The single in-flight operation slot. Push and pull are serialized
/// through it; the slot is reclaimed after `op_timeout` so a transport
/// that never completes cannot wedge the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpSlot {
    Idle,
    Busy { kind: OpKind, since: Instant },
}

/// Per-session mutable state. Only the version and tombstones outlive
/// the session, through the replica store.
#[derive(Debug)]
struct Session {
    version: u64,
    tombstones: TombstoneSet,
    page_turns: u32,
    last_turn: Option<Instant>,
    last_position: Option<String>,
    debounce: DebounceState,
    pending_pull_at: Option<Instant>,
    op: OpSlot,
    closed: bool,
}

/// The per-document sync scheduler.
///
/// Created when a document opens, discarded after [`SyncEvent::DocumentClosing`].
/// Single-threaded by design: the host delivers events and timer fires
/// from one place, and the transport completes synchronously within
/// the call that started it.
pub struct SyncScheduler<T: SyncTransport, R: ReplicaStore> {
    config: SyncConfig,
    document: String,
    transport: Arc<T>,
    store: Arc<R>,
    ui: Arc<dyn UiHandle>,
    net: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
    session: Mutex<Session>,
}

impl<T: SyncTransport, R: ReplicaStore> SyncScheduler<T, R> {
    /// Creates a scheduler for one document, loading the persisted
    /// version and tombstones from the replica store.
    pub fn new(
        config: SyncConfig,
        document: impl Into<String>,
        transport: Arc<T>,
        store: Arc<R>,
        ui: Arc<dyn UiHandle>,
        net: Arc<dyn Connectivity>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        let session = Session {
            version: store.annotation_version()?,
            tombstones: store.tombstones()?,
            page_turns: 0,
            last_turn: None,
            last_position: None,
            debounce: DebounceState::Idle,
            pending_pull_at: None,
            op: OpSlot::Idle,
            closed: false,
        };
        Ok(Self {
            config,
            document: document.into(),
            transport,
            store,
            ui,
            net,
            clock,
            session: Mutex::new(session),
        })
    }

    /// Feeds one external event into the session.
    pub fn handle_event(&self, event: SyncEvent) {
        if self.session.lock().closed {
            tracing::debug!(?event, "event ignored: session closed");
            return;
        }

        match event {
            SyncEvent::DocumentOpened => {
                if !self.config.auto_sync {
                    return;
                }
                if self.net.is_online() {
                    let _ = self.pull(Trigger::Background);
                } else {
                    tracing::debug!("open pull deferred until connectivity returns");
                }
            }
            SyncEvent::DocumentClosing => {
                if self.config.auto_sync {
                    let _ = self.push(Trigger::Background);
                }
                self.session.lock().closed = true;
            }
            SyncEvent::Suspending | SyncEvent::NetworkDown => {
                // Best effort before the window closes; no retry here.
                if self.config.auto_sync {
                    let _ = self.push(Trigger::Background);
                }
            }
            SyncEvent::Resumed | SyncEvent::NetworkUp => {
                if !self.config.auto_sync {
                    return;
                }
                let at = self.clock.now() + self.config.revive_delay;
                self.session.lock().pending_pull_at = Some(at);
            }
            SyncEvent::PageTurned { position } => self.on_page_turn(position),
            SyncEvent::ManualPush => {
                let _ = self.push(Trigger::Interactive);
            }
            SyncEvent::ManualPull => {
                let _ = self.pull(Trigger::Interactive);
            }
        }
    }

    /// Records a local annotation deletion for propagation on the next
    /// push. Idempotent per identifier.
    pub fn record_deletion(&self, id: &str) -> SyncResult<()> {
        let snapshot = {
            let mut s = self.session.lock();
            s.tombstones.record(id).then(|| s.tombstones.clone())
        };
        if let Some(tombstones) = snapshot {
            self.store.save_tombstones(&tombstones)?;
        }
        Ok(())
    }

    /// The earliest instant at which [`Self::on_timer_fire`] has work.
    /// The host arms its timer for this; spurious fires are harmless.
    pub fn next_deadline(&self) -> Option<Instant> {
        let s = self.session.lock();
        let debounce = match s.debounce {
            DebounceState::Pending { deadline } => Some(deadline),
            DebounceState::Idle => None,
        };
        match (debounce, s.pending_pull_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs whatever timers have come due.
    pub fn on_timer_fire(&self) {
        let now = self.clock.now();

        let pull_due = {
            let mut s = self.session.lock();
            if s.closed {
                return;
            }
            match s.pending_pull_at {
                Some(at) if now >= at => {
                    s.pending_pull_at = None;
                    true
                }
                _ => false,
            }
        };
        if pull_due {
            let _ = self.pull(Trigger::Background);
        }

        let push_due = {
            let mut s = self.session.lock();
            match s.debounce {
                DebounceState::Pending { deadline } if now >= deadline => {
                    let idle = s
                        .last_turn
                        .map_or(true, |t| now.duration_since(t) >= self.config.debounce_delay);
                    if idle {
                        s.debounce = DebounceState::Idle;
                        true
                    } else {
                        // Still turning pages; try again after another
                        // full idle window.
                        s.debounce = DebounceState::Pending {
                            deadline: now + self.config.debounce_delay,
                        };
                        false
                    }
                }
                _ => false,
            }
        };
        if push_due {
            tracing::debug!("page activity settled; pushing");
            let _ = self.push(Trigger::Background);
        }
    }

    /// Pushes the local annotation set and pending deletions.
    ///
    /// Returns `Ok(())` without doing anything when another exchange
    /// holds the in-flight slot; the next trigger retries.
    pub fn push(&self, trigger: Trigger) -> SyncResult<()> {
        match self.guarded(OpKind::Push, || self.exchange_push()) {
            Some(result) => {
                self.report(trigger, "push", &result);
                result
            }
            None => Ok(()),
        }
    }

    /// Pulls the remote snapshot and merges it into the local store.
    ///
    /// Returns `Ok(())` without doing anything when another exchange
    /// holds the in-flight slot.
    pub fn pull(&self, trigger: Trigger) -> SyncResult<()> {
        match self.guarded(OpKind::Pull, || self.exchange_pull()) {
            Some(result) => {
                self.report(trigger, "pull", &result);
                result
            }
            None => Ok(()),
        }
    }

    /// Tombstones pending remote acknowledgement.
    pub fn pending_tombstones(&self) -> TombstoneSet {
        self.session.lock().tombstones.clone()
    }

    /// Page turns accumulated since the last confirmed push.
    pub fn page_turn_count(&self) -> u32 {
        self.session.lock().page_turns
    }

    /// Whether a debounced push is armed.
    pub fn debounce_pending(&self) -> bool {
        matches!(self.session.lock().debounce, DebounceState::Pending { .. })
    }

    /// The annotation version last confirmed by the remote store.
    pub fn last_seen_version(&self) -> u64 {
        self.session.lock().version
    }

    /// Whether the session has ended.
    pub fn is_closed(&self) -> bool {
        self.session.lock().closed
    }

    fn on_page_turn(&self, position: String) {
        if !self.config.auto_sync {
            return;
        }

        let arm = {
            let mut s = self.session.lock();
            if s.last_position.as_deref() == Some(position.as_str()) {
                return;
            }
            s.last_position = Some(position);
            s.page_turns += 1;
            s.last_turn = Some(self.clock.now());

            s.page_turns >= self.config.pages_per_push
                || matches!(s.debounce, DebounceState::Pending { .. })
        };
        if !arm {
            return;
        }

        // Connectivity must already be up; a page turn never dials.
        if !self.net.is_online() {
            tracing::debug!("page-turn push skipped: offline");
            return;
        }

        let mut s = self.session.lock();
        if matches!(s.debounce, DebounceState::Pending { .. }) {
            return; // arming is idempotent
        }
        let deadline = self.clock.now() + self.config.debounce_delay;
        s.debounce = DebounceState::Pending { deadline };
        tracing::debug!(turns = s.page_turns, "debounced push armed");
    }

    fn guarded<F>(&self, kind: OpKind, exchange: F) -> Option<SyncResult<()>>
    where
        F: FnOnce() -> SyncResult<()>,
    {
        if !self.config.has_credentials() {
            return Some(Err(SyncError::NotAuthenticated));
        }
        if !self.begin(kind) {
            tracing::debug!(?kind, "dropped: another exchange is in flight");
            return None;
        }
        let result = exchange();
        self.finish();
        Some(result)
    }

    fn begin(&self, kind: OpKind) -> bool {
        let now = self.clock.now();
        let mut s = self.session.lock();
        match s.op {
            OpSlot::Idle => {
                s.op = OpSlot::Busy { kind, since: now };
                true
            }
            OpSlot::Busy { kind: stuck, since } => {
                if now.duration_since(since) >= self.config.op_timeout {
                    tracing::warn!(?stuck, "reclaiming in-flight slot after timeout");
                    s.op = OpSlot::Busy { kind, since: now };
                    true
                } else {
                    false
                }
            }
        }
    }

    fn finish(&self) {
        self.session.lock().op = OpSlot::Idle;
    }

    fn exchange_push(&self) -> SyncResult<()> {
        let annotations = self.store.annotations()?;
        let (base_version, deleted) = {
            let s = self.session.lock();
            (s.version, s.tombstones.to_vec())
        };

        let upsert = AnnotationUpsert {
            annotations,
            deleted,
            base_version: Some(base_version),
        };
        let ack = self.transport.put_annotations(&self.document, &upsert)?;

        {
            let mut s = self.session.lock();
            s.version = ack.version;
            s.tombstones.clear();
            s.page_turns = 0;
            // A confirmed push satisfies any armed debounce.
            s.debounce = DebounceState::Idle;
        }
        self.store.set_annotation_version(ack.version)?;
        self.store.save_tombstones(&TombstoneSet::new())?;

        tracing::info!(version = ack.version, "annotations pushed");
        Ok(())
    }

    fn exchange_pull(&self) -> SyncResult<()> {
        let snapshot = self.transport.get_annotations(&self.document)?;

        let last_seen = self.session.lock().version;
        if snapshot.is_unchanged(last_seen) {
            tracing::debug!(version = last_seen, "pull: remote unchanged");
            return Ok(());
        }

        let local = self.store.annotations()?;
        let local_tombstones = self.session.lock().tombstones.clone();
        let merged = merge(
            &local,
            &snapshot.annotations,
            &snapshot.deleted_set(),
            &local_tombstones,
        );

        self.store.replace_annotations(merged)?;
        self.store.set_annotation_version(snapshot.version)?;
        self.session.lock().version = snapshot.version;

        tracing::info!(version = snapshot.version, "annotations pulled");
        Ok(())
    }

    fn report(&self, trigger: Trigger, action: &str, result: &SyncResult<()>) {
        match result {
            Ok(()) => {
                if trigger == Trigger::Interactive {
                    self.ui.notify(&format!("Annotation {action} complete."));
                }
            }
            Err(err) => {
                if trigger == Trigger::Interactive || err.always_surfaces() {
                    self.ui.notify(&format!("Annotation {action} failed: {err}"));
                } else {
                    tracing::debug!(error = %err, action, "background sync failed");
                }
            }
        }
    }
}
