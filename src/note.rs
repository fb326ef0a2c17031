//! Note and initiative input types
//!
//! The adapter boundary: hosts translate their persisted records into these
//! shapes before invoking the pipeline. The pipeline has no knowledge of the
//! storage format behind them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable note input. One pipeline invocation processes one note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteInput {
    pub note_id: String,
    pub raw_markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authored_at: Option<DateTime<Utc>>,
}

impl NoteInput {
    pub fn new(note_id: impl Into<String>, raw_markdown: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            raw_markdown: raw_markdown.into(),
            authored_at: None,
        }
    }

    /// Translate an external persisted record (`_id`/`body`/`createdAt`
    /// style) into pipeline input.
    pub fn from_record(
        id: impl Into<String>,
        body: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            note_id: id.into(),
            raw_markdown: body.into(),
            authored_at: created_at,
        }
    }
}

/// A lightweight view of an existing initiative, used only for routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeSnapshot {
    pub initiative_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl InitiativeSnapshot {
    pub fn new(
        initiative_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            initiative_id: initiative_id.into(),
            title: title.into(),
            summary: summary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_record_maps_fields() {
        let note = NoteInput::from_record("n-1", "# Heading\nbody", None);
        assert_eq!(note.note_id, "n-1");
        assert!(note.raw_markdown.starts_with("# Heading"));
        assert!(note.authored_at.is_none());
    }

    #[test]
    fn test_note_input_serializes_without_empty_timestamp() {
        let note = NoteInput::new("n-2", "text");
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("authored_at"));
    }
}
