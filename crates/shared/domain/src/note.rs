//! Note domain entity and the payloads used to create and edit it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{FIELD_CONTENT, FIELD_CREATED_AT, FIELD_ID, FIELD_TITLE, FIELD_UPDATED_AT};
use crate::error::{DomainError, DomainResult};

/// Raw document payload as stored in the document store.
pub type Document = Map<String, Value>;

/// Epoch-millisecond timestamp.
pub type Timestamp = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// Note domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier, unique within the owner's collection
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Set once when the note is added
    #[serde(default)]
    pub created_at: Timestamp,
    /// Refreshed on every mutation
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Note {
    /// Shape a stored payload into a note, merging the document id into it.
    ///
    /// The document id always wins over an `id` field inside the payload.
    pub fn from_document(id: &str, data: Document) -> DomainResult<Self> {
        let mut data = data;
        data.insert(FIELD_ID.to_string(), Value::String(id.to_string()));

        serde_json::from_value(Value::Object(data))
            .map_err(|e| DomainError::malformed(id, e.to_string()))
    }
}

/// Note creation payload. Identifier and timestamps are never caller-supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }

    /// Build the document written on add: draft fields plus both timestamps.
    pub fn into_document(self, now: Timestamp) -> Document {
        let mut doc = text_fields(self.title, self.content);
        doc.insert(FIELD_CREATED_AT.to_string(), Value::from(now));
        doc.insert(FIELD_UPDATED_AT.to_string(), Value::from(now));
        doc
    }
}

/// Note update payload. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    /// Build the partial document written on edit. `created_at` is never part of it.
    pub fn into_document(self, now: Timestamp) -> Document {
        let mut doc = text_fields(self.title, self.content);
        doc.insert(FIELD_UPDATED_AT.to_string(), Value::from(now));
        doc
    }
}

fn text_fields(title: Option<String>, content: Option<String>) -> Document {
    let mut doc = Document::new();
    if let Some(title) = title {
        doc.insert(FIELD_TITLE.to_string(), Value::String(title));
    }
    if let Some(content) = content {
        doc.insert(FIELD_CONTENT.to_string(), Value::String(content));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_draft_sets_both_timestamps() {
        let doc = NoteDraft::new("A", "x").into_document(1_000);

        assert_eq!(doc[FIELD_TITLE], json!("A"));
        assert_eq!(doc[FIELD_CONTENT], json!("x"));
        assert_eq!(doc[FIELD_CREATED_AT], json!(1_000));
        assert_eq!(doc[FIELD_UPDATED_AT], json!(1_000));
    }

    #[test]
    fn test_empty_draft_only_has_timestamps() {
        let doc = NoteDraft::default().into_document(5);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_patch_never_writes_created_at() {
        let doc = NotePatch::title("B").into_document(2_000);

        assert_eq!(doc[FIELD_TITLE], json!("B"));
        assert_eq!(doc[FIELD_UPDATED_AT], json!(2_000));
        assert!(!doc.contains_key(FIELD_CREATED_AT));
        assert!(!doc.contains_key(FIELD_CONTENT));
    }

    #[test]
    fn test_from_document_merges_id() {
        let data = as_document(json!({
            "title": "A",
            "content": "x",
            "created_at": 10,
            "updated_at": 20,
        }));

        let note = Note::from_document("n1", data).unwrap();
        assert_eq!(
            note,
            Note {
                id: "n1".to_string(),
                title: "A".to_string(),
                content: "x".to_string(),
                created_at: 10,
                updated_at: 20,
            }
        );
    }

    #[test]
    fn test_from_document_id_overrides_payload_id() {
        let data = as_document(json!({ "id": "stale", "title": "A" }));
        let note = Note::from_document("fresh", data).unwrap();
        assert_eq!(note.id, "fresh");
    }

    #[test]
    fn test_from_document_defaults_missing_fields() {
        let note = Note::from_document("n1", Document::new()).unwrap();
        assert_eq!(note.title, "");
        assert_eq!(note.created_at, 0);
    }

    #[test]
    fn test_from_document_rejects_wrong_types() {
        let data = as_document(json!({ "title": 42 }));
        let err = Note::from_document("n1", data).unwrap_err();
        assert!(matches!(err, DomainError::MalformedDocument { ref id, .. } if id == "n1"));
    }
}
