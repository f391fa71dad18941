//! Diagram data model — persisted records, wire payloads, and raw on-disk documents.

use serde::{Deserialize, Serialize};

/// A diagram as persisted in the local store.
///
/// Missing fields deserialize to their defaults so partially filled requests
/// from the host still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramRecord {
    /// Assigned by the store on first local save when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    /// Serialized diagram source.
    pub text: String,
    /// `data:` URI of the preview image.
    pub thumbnail: String,
    /// Diagram-type discriminator, e.g. `usm` or `bmc`.
    pub diagram: String,
    pub is_public: bool,
    pub is_bookmark: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
}

/// A diagram crossing the host boundary: the record plus its routing flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(flatten)]
    pub record: DiagramRecord,
    /// `true` when the remote collaborator owns this diagram.
    #[serde(default)]
    pub is_remote: bool,
}

impl Diagram {
    pub fn local(record: DiagramRecord) -> Self {
        Self {
            record,
            is_remote: false,
        }
    }

    pub fn remote(record: DiagramRecord) -> Self {
        Self {
            record,
            is_remote: true,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id.as_deref()
    }
}

/// A diagram exactly as read back from the local store.
///
/// Rows written by older schema versions or interrupted writes may lack any
/// field except the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    /// Taken from the row key, never from the body.
    #[serde(skip)]
    pub id: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub thumbnail: Option<String>,
    pub diagram: Option<String>,
    pub is_public: Option<bool>,
    pub is_bookmark: Option<bool>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl DiagramDocument {
    /// Fill every missing field with a safe default, using `now` for absent timestamps.
    pub fn backfill(self, now: i64) -> DiagramRecord {
        let created_at = self.created_at.unwrap_or(now);
        let updated_at = self.updated_at.unwrap_or(now).max(created_at);
        DiagramRecord {
            id: Some(self.id),
            title: self.title.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            thumbnail: self.thumbnail.unwrap_or_default(),
            diagram: self.diagram.unwrap_or_default(),
            is_public: self.is_public.unwrap_or(false),
            is_bookmark: self.is_bookmark.unwrap_or(false),
            created_at,
            updated_at,
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
