//! One-shot reading-position exchange.
//!
//! Much simpler than annotation sync: a single record per document,
//! last writer wins, and the only conflict policy is deciding whether
//! to move the user's reading position.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::scheduler::Trigger;
use crate::store::{ReplicaStore, UiHandle};
use crate::transport::SyncTransport;
use folio_sync_protocol::ProgressUpdate;
use std::sync::Arc;

/// Positions closer than this fraction count as already converged.
const PROGRESS_EPSILON: f64 = 0.001;

/// What a progress pull decided.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// The remote store had no record for this document.
    NotFound,
    /// The record was authored by this device; nothing to do.
    SelfAuthored,
    /// Local and remote positions already agree.
    AlreadyConverged,
    /// The remote position was applied.
    Applied {
        /// The position the replica moved to.
        position: String,
        /// The matching progress fraction.
        percentage: f64,
    },
    /// Background trigger; the user declined to move.
    Declined,
}

/// Pushes and pulls the reading position for one document.
pub struct ProgressSyncer<T: SyncTransport, R: ReplicaStore> {
    config: SyncConfig,
    document: String,
    transport: Arc<T>,
    store: Arc<R>,
    ui: Arc<dyn UiHandle>,
}

impl<T: SyncTransport, R: ReplicaStore> ProgressSyncer<T, R> {
    /// Creates a syncer for one document.
    pub fn new(
        config: SyncConfig,
        document: impl Into<String>,
        transport: Arc<T>,
        store: Arc<R>,
        ui: Arc<dyn UiHandle>,
    ) -> Self {
        Self {
            config,
            document: document.into(),
            transport,
            store,
            ui,
        }
    }

    /// Uploads the current reading position. Fire and forget: the
    /// outcome is only reported for interactive triggers, except
    /// authentication failures, which always surface.
    pub fn push(&self, trigger: Trigger) -> SyncResult<()> {
        let result = self.upload();
        match &result {
            Ok(()) => {
                if trigger == Trigger::Interactive {
                    self.ui.notify("Reading progress pushed.");
                }
            }
            Err(err) => self.report_failure(trigger, err),
        }
        result
    }

    /// Fetches the remote position and applies the conflict policy.
    ///
    /// A record authored by this device, or one already within a
    /// hair's breadth of the local fraction, is a no-op. An
    /// interactive trigger applies a winning remote position
    /// immediately; a background trigger asks the user first and never
    /// moves the position silently.
    pub fn pull(&self, trigger: Trigger) -> SyncResult<PullOutcome> {
        let result = self.decide(trigger);
        match &result {
            Ok(outcome) => {
                if trigger == Trigger::Interactive {
                    self.notify_outcome(outcome);
                }
            }
            Err(err) => self.report_failure(trigger, err),
        }
        result
    }

    fn upload(&self) -> SyncResult<()> {
        if !self.config.has_credentials() {
            return Err(SyncError::NotAuthenticated);
        }
        let (position, percentage) = self.store.position()?;
        let update = ProgressUpdate {
            document: self.document.clone(),
            progress: position,
            percentage,
            device: self.config.device_model.clone(),
            device_id: Some(self.store.device_id()?),
        };
        self.transport.put_progress(&update)?;
        tracing::debug!(percentage, "progress pushed");
        Ok(())
    }

    fn decide(&self, trigger: Trigger) -> SyncResult<PullOutcome> {
        if !self.config.has_credentials() {
            return Err(SyncError::NotAuthenticated);
        }

        let Some(record) = self.transport.get_progress(&self.document)? else {
            return Ok(PullOutcome::NotFound);
        };

        if record.device_id.as_deref() == Some(self.store.device_id()?.as_str()) {
            return Ok(PullOutcome::SelfAuthored);
        }

        let (_, local_percentage) = self.store.position()?;
        let remote_percentage = record.percentage.unwrap_or(0.0);
        if (local_percentage - remote_percentage).abs() < PROGRESS_EPSILON {
            return Ok(PullOutcome::AlreadyConverged);
        }

        if trigger == Trigger::Background {
            let device = record.device.as_deref().unwrap_or("another device");
            let prompt = format!("Sync to the reading position from {device}?");
            if !self.ui.confirm(&prompt) {
                return Ok(PullOutcome::Declined);
            }
        }

        let position = record.progress.clone().unwrap_or_default();
        self.store.apply_position(&position, remote_percentage)?;
        tracing::info!(percentage = remote_percentage, "progress applied from remote");
        Ok(PullOutcome::Applied {
            position,
            percentage: remote_percentage,
        })
    }

    fn notify_outcome(&self, outcome: &PullOutcome) {
        match outcome {
            PullOutcome::NotFound => {
                self.ui
                    .notify("No reading progress found for this document.");
            }
            PullOutcome::SelfAuthored | PullOutcome::AlreadyConverged => {
                self.ui.notify("Reading progress is already up to date.");
            }
            PullOutcome::Applied { .. } => {
                self.ui.notify("Reading position synchronized.");
            }
            PullOutcome::Declined => {}
        }
    }

    fn report_failure(&self, trigger: Trigger, err: &SyncError) {
        if trigger == Trigger::Interactive || err.always_surfaces() {
            self.ui.notify(&format!("Progress sync failed: {err}"));
        } else {
            tracing::debug!(error = %err, "background progress sync failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryReplicaStore, ScriptedUi};
    use crate::transport::MockTransport;
    use folio_sync_protocol::ProgressRecord;

    struct Rig {
        transport: Arc<MockTransport>,
        store: Arc<MemoryReplicaStore>,
        ui: Arc<ScriptedUi>,
        syncer: ProgressSyncer<MockTransport, MemoryReplicaStore>,
    }

    fn rig() -> Rig {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryReplicaStore::new());
        let ui = Arc::new(ScriptedUi::new());
        let config = SyncConfig::new("https://sync.example.com", "reader", "deadbeef")
            .with_device_model("Folio Desktop");
        let syncer = ProgressSyncer::new(
            config,
            "d41d8cd9",
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&ui) as Arc<dyn UiHandle>,
        );
        Rig {
            transport,
            store,
            ui,
            syncer,
        }
    }

    fn remote_record(device_id: &str, percentage: f64) -> ProgressRecord {
        ProgressRecord {
            document: Some("d41d8cd9".into()),
            progress: Some("112".into()),
            percentage: Some(percentage),
            device: Some("Folio Mobile".into()),
            device_id: Some(device_id.into()),
            timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn push_reports_the_local_position() {
        let rig = rig();
        rig.store.set_position("57", 0.31);

        rig.syncer.push(Trigger::Background).unwrap();

        let pushed = rig.transport.pushed_progress();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].progress, "57");
        assert_eq!(pushed[0].percentage, 0.31);
        assert_eq!(pushed[0].device, "Folio Desktop");
        assert_eq!(
            pushed[0].device_id.as_deref(),
            Some(rig.store.device_id().unwrap().as_str())
        );
        // background success is silent
        assert!(rig.ui.notifications().is_empty());
    }

    #[test]
    fn nothing_remote_is_a_noop() {
        let rig = rig();
        rig.transport.set_progress_record(None);

        let outcome = rig.syncer.pull(Trigger::Background).unwrap();
        assert_eq!(outcome, PullOutcome::NotFound);
        assert!(rig.ui.notifications().is_empty());

        // interactive callers hear about it
        let outcome = rig.syncer.pull(Trigger::Interactive).unwrap();
        assert_eq!(outcome, PullOutcome::NotFound);
        assert!(rig.ui.notifications()[0].contains("No reading progress"));
    }

    #[test]
    fn self_authored_records_are_skipped() {
        let rig = rig();
        rig.store.set_position("10", 0.10);
        let own_id = rig.store.device_id().unwrap();
        rig.transport
            .set_progress_record(Some(remote_record(&own_id, 0.85)));

        let outcome = rig.syncer.pull(Trigger::Interactive).unwrap();
        assert_eq!(outcome, PullOutcome::SelfAuthored);
        assert_eq!(rig.store.position().unwrap().1, 0.10);
    }

    #[test]
    fn near_identical_positions_converge_silently() {
        let rig = rig();
        rig.store.set_position("112", 0.8501);
        rig.transport
            .set_progress_record(Some(remote_record("other-device", 0.8505)));

        let outcome = rig.syncer.pull(Trigger::Background).unwrap();
        assert_eq!(outcome, PullOutcome::AlreadyConverged);
        assert!(rig.ui.prompts().is_empty());
    }

    #[test]
    fn interactive_pull_applies_immediately() {
        let rig = rig();
        rig.store.set_position("10", 0.10);
        rig.transport
            .set_progress_record(Some(remote_record("other-device", 0.85)));

        let outcome = rig.syncer.pull(Trigger::Interactive).unwrap();
        assert_eq!(
            outcome,
            PullOutcome::Applied {
                position: "112".into(),
                percentage: 0.85
            }
        );
        assert_eq!(rig.store.position().unwrap(), ("112".into(), 0.85));
        // no confirmation was asked
        assert!(rig.ui.prompts().is_empty());
    }

    #[test]
    fn background_pull_asks_before_moving() {
        let rig = rig();
        rig.store.set_position("10", 0.10);
        rig.transport
            .set_progress_record(Some(remote_record("other-device", 0.85)));

        // declined: the position stays put
        let outcome = rig.syncer.pull(Trigger::Background).unwrap();
        assert_eq!(outcome, PullOutcome::Declined);
        assert_eq!(rig.store.position().unwrap().1, 0.10);
        assert_eq!(rig.ui.prompts().len(), 1);
        assert!(rig.ui.prompts()[0].contains("Folio Mobile"));

        // accepted: it moves
        rig.ui.answer_confirmations(true);
        let outcome = rig.syncer.pull(Trigger::Background).unwrap();
        assert!(matches!(outcome, PullOutcome::Applied { .. }));
        assert_eq!(rig.store.position().unwrap().1, 0.85);
    }

    #[test]
    fn failures_surface_per_trigger() {
        let rig = rig();
        rig.transport.set_failure(Some("connection reset"));

        assert!(rig.syncer.pull(Trigger::Background).is_err());
        assert!(rig.ui.notifications().is_empty());

        assert!(rig.syncer.pull(Trigger::Interactive).is_err());
        assert!(rig.ui.notifications()[0].contains("Progress sync failed"));
    }

    #[test]
    fn auth_rejection_always_surfaces() {
        let rig = rig();
        rig.transport.set_reject_auth(true);

        assert!(rig.syncer.push(Trigger::Background).is_err());
        assert!(!rig.ui.notifications().is_empty());
    }
}
