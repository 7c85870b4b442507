//! Reading-progress wire types.

use serde::{Deserialize, Serialize};

/// Body of a progress upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Opaque document digest.
    pub document: String,
    /// Reading position (page number or position pointer, rendered as a
    /// string by the caller).
    pub progress: String,
    /// Progress through the document, `0.0 ..= 1.0`.
    pub percentage: f64,
    /// Human-readable device model.
    pub device: String,
    /// Stable device identity of the author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Acknowledgement of a progress upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdateAck {
    /// Echo of the document digest.
    #[serde(default)]
    pub document: String,
    /// Server receive time, Unix seconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// A progress record as the remote store returns it.
///
/// Every field is optional: a store with no record for the document
/// answers with an empty object rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Opaque document digest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Reading position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Progress through the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Device model that authored the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Stable device identity that authored the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Server receive time, Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ProgressRecord {
    /// Whether the store had anything at all for the document.
    pub fn is_found(&self) -> bool {
        self.progress.is_some() || self.percentage.is_some()
    }
}
