//! Annotation records and their merge identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an annotation sits in the document: a page number for paged
/// documents, or a position-anchor string for reflowable ones.
///
/// The wire carries either a JSON number or a JSON string, so the enum
/// is untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    /// Fixed page number.
    Number(i64),
    /// Reading-position anchor (an xpointer or similar).
    Anchor(String),
}

impl Default for PageRef {
    fn default() -> Self {
        PageRef::Number(0)
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{n}"),
            PageRef::Anchor(a) => f.write_str(a),
        }
    }
}

/// The composite identity used to match annotations across replicas:
/// page locator plus start/end selection bounds.
///
/// Two distinct annotations that coincidentally share identical bounds
/// collapse into one conflict slot during a merge; that is an accepted
/// limitation of the identity scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey(String);

impl PositionKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A highlight, note or bookmark as replicas exchange it.
///
/// Only `datetime`, `datetime_updated`, `page`, `pos0` and `pos1`
/// matter to the merge; the remaining fields are payload carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Creation timestamp, `YYYY-MM-DD HH:MM:SS`. Doubles as the
    /// annotation's deletion identifier across replicas; it never
    /// changes after creation (edits touch `datetime_updated` only).
    #[serde(default)]
    pub datetime: String,
    /// Timestamp of the last content edit, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime_updated: Option<String>,
    /// Highlight style (underline, invert, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawer: Option<String>,
    /// Highlight color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Highlighted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Whether the highlighted text was hand-edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_edited: Option<bool>,
    /// Attached note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Chapter title at the annotation's position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    /// Display page number, when it differs from the locator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageno: Option<i32>,
    /// Page locator.
    #[serde(default)]
    pub page: PageRef,
    /// Selection start, opaque to the merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos0: Option<serde_json::Value>,
    /// Selection end, opaque to the merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos1: Option<serde_json::Value>,
}

impl Annotation {
    /// Creates a bare annotation at the given position.
    pub fn new(datetime: impl Into<String>, page: PageRef) -> Self {
        Self {
            datetime: datetime.into(),
            datetime_updated: None,
            drawer: None,
            color: None,
            text: None,
            text_edited: None,
            note: None,
            chapter: None,
            pageno: None,
            page,
            pos0: None,
            pos1: None,
        }
    }

    /// Sets the highlighted text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the last-edit timestamp.
    pub fn with_updated(mut self, datetime_updated: impl Into<String>) -> Self {
        self.datetime_updated = Some(datetime_updated.into());
        self
    }

    /// Sets the selection bounds.
    pub fn with_bounds(mut self, pos0: serde_json::Value, pos1: serde_json::Value) -> Self {
        self.pos0 = Some(pos0);
        self.pos1 = Some(pos1);
        self
    }

    /// The identity used to match this annotation against another
    /// replica's copy.
    pub fn position_key(&self) -> PositionKey {
        let pos0 = self.pos0.as_ref().map(|v| v.to_string()).unwrap_or_default();
        let pos1 = self.pos1.as_ref().map(|v| v.to_string()).unwrap_or_default();
        PositionKey(format!("{}|{}|{}", self.page, pos0, pos1))
    }

    /// The timestamp that decides conflicts: the last edit if present,
    /// else creation. A missing value behaves as the empty string and
    /// sorts oldest. The fixed `YYYY-MM-DD HH:MM:SS` format makes
    /// lexicographic comparison chronological.
    pub fn effective_timestamp(&self) -> &str {
        self.datetime_updated.as_deref().unwrap_or(&self.datetime)
    }

    /// The identifier tombstones refer to.
    pub fn id(&self) -> &str {
        &self.datetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn position_key_combines_page_and_bounds() {
        let a = Annotation::new("2024-01-15 10:30:00", PageRef::Number(5))
            .with_bounds(json!(0), json!(10));
        assert_eq!(a.position_key().as_str(), "5|0|10");

        let b = Annotation::new("2024-01-15 10:30:00", PageRef::Anchor("/body/p[3]".into()));
        assert_eq!(b.position_key().as_str(), "/body/p[3]||");
    }

    #[test]
    fn same_bounds_same_key() {
        let a = Annotation::new("2024-01-15 10:30:00", PageRef::Number(5))
            .with_bounds(json!("x1"), json!("x2"));
        let b = Annotation::new("2024-02-20 08:00:00", PageRef::Number(5))
            .with_bounds(json!("x1"), json!("x2"));
        assert_eq!(a.position_key(), b.position_key());
    }

    #[test]
    fn effective_timestamp_prefers_update() {
        let a = Annotation::new("2024-01-15 10:30:00", PageRef::Number(1));
        assert_eq!(a.effective_timestamp(), "2024-01-15 10:30:00");

        let b = a.clone().with_updated("2024-03-01 12:00:00");
        assert_eq!(b.effective_timestamp(), "2024-03-01 12:00:00");
        // identity is unaffected by edits
        assert_eq!(b.id(), "2024-01-15 10:30:00");
    }

    #[test]
    fn missing_timestamp_sorts_oldest() {
        let blank = Annotation::new("", PageRef::Number(1));
        let dated = Annotation::new("2024-01-15 10:30:00", PageRef::Number(1));
        assert!(blank.effective_timestamp() < dated.effective_timestamp());
    }

    #[test]
    fn page_ref_wire_forms() {
        let paged: Annotation =
            serde_json::from_value(json!({"datetime": "2024-01-15 10:30:00", "page": 12}))
                .unwrap();
        assert_eq!(paged.page, PageRef::Number(12));

        let reflow: Annotation = serde_json::from_value(
            json!({"datetime": "2024-01-15 10:30:00", "page": "/body/DocFragment[7]"}),
        )
        .unwrap();
        assert_eq!(reflow.page, PageRef::Anchor("/body/DocFragment[7]".into()));
    }

    #[test]
    fn absent_fields_default() {
        // A response missing the timestamp must not fail decoding.
        let a: Annotation = serde_json::from_value(json!({"page": 3})).unwrap();
        assert_eq!(a.datetime, "");
        assert_eq!(a.effective_timestamp(), "");
    }

    #[test]
    fn payload_survives_roundtrip() {
        let a = Annotation {
            note: Some("margin note".into()),
            color: Some("yellow".into()),
            chapter: Some("III".into()),
            ..Annotation::new("2024-01-15 10:30:00", PageRef::Number(5))
        };
        let json = serde_json::to_value(&a).unwrap();
        let back: Annotation = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
