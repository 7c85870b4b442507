//! # Folio Sync Engine
//!
//! Event-driven synchronization of reading state (annotations and
//! reading position) between a replica and a remote store speaking a
//! small per-call-authenticated JSON protocol.
//!
//! This crate provides:
//! - [`SyncScheduler`]: the per-document state machine deciding *when*
//!   to push or pull (open/close/suspend/connectivity triggers and a
//!   debounced page-turn policy)
//! - [`ProgressSyncer`]: the one-shot reading-position exchange
//! - [`SyncTransport`]: the remote-store seam, with a JSON/HTTP
//!   implementation ([`JsonTransport`]) and a scripted mock
//! - Collaborator seams for the host: [`ReplicaStore`], [`UiHandle`],
//!   [`Connectivity`], [`Clock`]
//!
//! The merge algorithm itself lives in `folio_sync_protocol` and is
//! invoked from the scheduler's pull path.
//!
//! ## Architecture
//!
//! The engine is single-threaded and cooperative: the host feeds
//! [`SyncEvent`]s and drives one timer armed for
//! [`SyncScheduler::next_deadline`]. All session state is mutated
//! inside the scheduler's own calls, so no locking discipline is
//! imposed on the host.
//!
//! ## Key invariants
//!
//! - Push and pull are serialized through a single in-flight slot;
//!   the slot is reclaimed after a deadline so a wedged transport
//!   cannot block the session forever
//! - Tombstones are cleared only by a confirmed push; failures leave
//!   them for the next attempt
//! - At most one debounce timer is armed per session; arming is
//!   idempotent
//! - A failed exchange changes nothing; the next natural trigger is
//!   the only retry driver

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod http;
mod progress;
mod scheduler;
mod store;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{derive_secret, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpResponse, JsonTransport};
pub use progress::{ProgressSyncer, PullOutcome};
pub use scheduler::{SyncEvent, SyncScheduler, Trigger};
pub use store::{
    Connectivity, ManualConnectivity, MemoryReplicaStore, ReplicaStore, ScriptedUi, UiHandle,
};
pub use transport::{MockTransport, SyncTransport};
