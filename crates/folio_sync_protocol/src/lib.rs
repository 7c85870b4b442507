//! # Folio Sync Protocol
//!
//! Wire types and the pure merge algorithm for Folio's reading-state
//! sync.
//!
//! This crate provides:
//! - [`Annotation`] and its merge identity ([`PositionKey`])
//! - [`TombstoneSet`] deletion markers
//! - [`merge`], the replica-local conflict resolution algorithm
//! - Request/response bodies for the remote store's JSON protocol
//!
//! This is a pure protocol crate with no I/O.
//!
//! ## Key invariants
//!
//! - `merge` is deterministic and total
//! - A remote tombstone removes the local copy regardless of timestamps
//! - A local tombstone keeps an unpushed deletion from being
//!   resurrected by a pull
//! - Equal effective timestamps keep the local copy

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod annotation;
mod merge;
mod messages;
mod progress;
mod tombstone;

pub use annotation::{Annotation, PageRef, PositionKey};
pub use merge::merge;
pub use messages::{
    AnnotationSnapshot, AnnotationUpsert, AnnotationUpsertAck, AuthAck, RegisterAck,
    RegisterRequest,
};
pub use progress::{ProgressRecord, ProgressUpdate, ProgressUpdateAck};
pub use tombstone::TombstoneSet;
