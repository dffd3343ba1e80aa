
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A knowledge document. Slices of its content are embedded and registered
/// in the vector index individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub origin: Option<String>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Explicit identifier; a UUID is generated when absent.
    pub id: Option<String>,
    pub title: String,
    pub origin: Option<String>,
}

/// Mutable document fields. Identifier and creation date are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub origin: Option<String>,
}

/// A contiguous span of a document's text, the unit of embedding.
///
/// `vector_id` stays NULL until the embedding has been registered in the
/// vector index; `word_count` is derived from `content` on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Slice {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub word_count: i64,
    pub vector_id: Option<String>,
    pub enabled: bool,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSlice {
    pub id: Option<String>,
    pub document_id: String,
    pub content: String,
}

/// Mutable slice fields, merged onto the stored row by the synchronizer.
/// Word count is intentionally absent; it is recomputed from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SliceUpdate {
    pub content: Option<String>,
    pub enabled: Option<bool>,
    pub vector_id: Option<String>,
}

impl Slice {
    /// True while the slice has no registered embedding yet.
    #[inline]
    pub fn is_pending_embedding(&self) -> bool {
        self.vector_id.is_none()
    }
}
