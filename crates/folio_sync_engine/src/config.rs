//! Configuration for a sync session.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::Duration;

/// Derives the per-call secret from an account password.
///
/// The raw password never leaves the device; every remote call carries
/// this digest instead.
pub fn derive_secret(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Configuration for one document's sync session.
///
/// Constructed at document open and owned by the scheduler; there is no
/// process-wide mutable configuration. The `auto_sync` flag gates every
/// scheduler-driven trigger; manual pushes and pulls ignore it.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote store.
    pub server_url: String,
    /// Account name.
    pub username: String,
    /// Derived secret sent with every call (see [`derive_secret`]).
    pub secret: String,
    /// Human-readable device model, reported with progress records.
    pub device_model: String,
    /// Whether scheduler events trigger sync automatically.
    pub auto_sync: bool,
    /// Page turns accumulated before a debounced push is armed.
    pub pages_per_push: u32,
    /// Idle window that must elapse after the last page turn before the
    /// debounced push fires.
    pub debounce_delay: Duration,
    /// Delay before the pull issued on resume or reconnect.
    pub revive_delay: Duration,
    /// Deadline after which a wedged in-flight operation slot is
    /// reclaimed.
    pub op_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration with the default timing knobs.
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            username: username.into(),
            secret: secret.into(),
            device_model: String::new(),
            auto_sync: true,
            pages_per_push: 5,
            debounce_delay: Duration::from_secs(3),
            revive_delay: Duration::from_secs(2),
            op_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the reported device model.
    pub fn with_device_model(mut self, model: impl Into<String>) -> Self {
        self.device_model = model.into();
        self
    }

    /// Enables or disables automatic sync triggers.
    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    /// Sets the page-turn threshold.
    pub fn with_pages_per_push(mut self, pages: u32) -> Self {
        self.pages_per_push = pages;
        self
    }

    /// Sets the debounce idle window.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Sets the resume/reconnect pull delay.
    pub fn with_revive_delay(mut self, delay: Duration) -> Self {
        self.revive_delay = delay;
        self
    }

    /// Sets the in-flight reclamation deadline.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Whether an account is configured at all.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.secret.is_empty()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let config = SyncConfig::new("https://sync.example.com", "reader", "s3cret")
            .with_device_model("Folio Desktop")
            .with_pages_per_push(10)
            .with_debounce_delay(Duration::from_secs(5))
            .with_auto_sync(false);

        assert_eq!(config.server_url, "https://sync.example.com");
        assert_eq!(config.pages_per_push, 10);
        assert_eq!(config.debounce_delay, Duration::from_secs(5));
        assert!(!config.auto_sync);
        assert!(config.has_credentials());
    }

    #[test]
    fn blank_account_has_no_credentials() {
        assert!(!SyncConfig::default().has_credentials());
        assert!(!SyncConfig::new("https://x", "reader", "").has_credentials());
        assert!(!SyncConfig::new("https://x", "", "key").has_credentials());
    }

    #[test]
    fn secret_derivation_is_stable_and_hex() {
        let a = derive_secret("hunter2");
        let b = derive_secret("hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, derive_secret("hunter3"));
    }
}
