// Synchronization engine
// Keeps the relational record store and the vector index consistent across
// independently-failing writes. Every multi-step sequence here is ordered so
// that a crash between steps is recoverable by retrying the same call.


pub mod reconcile;

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::sqlite::Database;
use crate::database::sqlite::models::{
    Document, DocumentUpdate, NewDocument, NewSlice, Slice, SliceUpdate,
};
use crate::database::vector::VectorIndexClient;
use crate::{KnowledgeError, Result};

pub use reconcile::{ReconciliationReport, Reconciler};

/// Character length of slice content. The original record format stores this
/// as `word_count`, derived on every write, never supplied by the caller.
fn word_count(content: &str) -> i64 {
    content.chars().count() as i64
}

/// Orchestrates slice lifecycle across the record store and the vector index.
///
/// Holds no mutable state; safe to clone and call from any number of
/// concurrent callers.
#[derive(Clone)]
pub struct SliceSynchronizer {
    database: Database,
    vector_index: Arc<dyn VectorIndexClient>,
}

impl SliceSynchronizer {
    #[inline]
    pub fn new(database: Database, vector_index: Arc<dyn VectorIndexClient>) -> Self {
        Self {
            database,
            vector_index,
        }
    }

    /// Inserts a new slice row with a NULL vector id.
    ///
    /// The relational row always exists before any vector-index work happens,
    /// so a crash before registration leaves a recoverable row rather than an
    /// orphaned index entry. Registration is a separate step, see
    /// [`Self::attach_embedding`].
    #[inline]
    pub async fn add_slice(&self, new_slice: NewSlice) -> Result<Slice> {
        if self
            .database
            .get_document(&new_slice.document_id)
            .await?
            .is_none()
        {
            return Err(KnowledgeError::NotFound {
                entity: "document",
                id: new_slice.document_id,
            });
        }

        let slice = Slice {
            id: new_slice.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            document_id: new_slice.document_id,
            word_count: word_count(&new_slice.content),
            content: new_slice.content,
            vector_id: None,
            enabled: true,
            created_date: Utc::now().naive_utc(),
        };

        self.database.insert_slice(&slice).await?;
        debug!(
            "added slice [{}] to document [{}], word count: [{}]",
            slice.id, slice.document_id, slice.word_count
        );
        Ok(slice)
    }

    /// Registers an embedding for a slice and persists the resulting vector
    /// id.
    ///
    /// Ordering rule: the index registration must succeed before the vector
    /// id is written to the row, so the row never points at an entry that was
    /// never created. If registration fails the row keeps its previous vector
    /// id (NULL on first embed) and the caller may retry with a fresh
    /// embedding. On re-embed the replaced entry is deleted only after the
    /// relational update commits.
    #[inline]
    pub async fn attach_embedding(&self, slice_id: &str, embedding: &[f32]) -> Result<Slice> {
        let mut slice = self.get_slice_required(slice_id).await?;
        let previous_vector_id = slice.vector_id.take();

        let vector_id = Uuid::new_v4().to_string();
        self.vector_index.register(&vector_id, embedding).await?;

        slice.vector_id = Some(vector_id);
        self.database.update_slice(&slice).await?;

        if let Some(old_id) = previous_vector_id {
            self.delete_replaced_vector(&slice.id, &old_id).await;
        }

        debug!(
            "registered embedding for slice [{}], vector id: [{:?}]",
            slice.id, slice.vector_id
        );
        Ok(slice)
    }

    /// Merge-updates a slice. A content change recomputes the word count; a
    /// supplied vector id replaces the old one, which is deleted from the
    /// index only after the relational update commits.
    #[inline]
    pub async fn update_slice(&self, slice_id: &str, update: SliceUpdate) -> Result<Slice> {
        let mut slice = self.get_slice_required(slice_id).await?;

        if let Some(content) = update.content {
            slice.word_count = word_count(&content);
            slice.content = content;
        }
        if let Some(enabled) = update.enabled {
            slice.enabled = enabled;
        }

        let mut replaced_vector_id = None;
        if let Some(vector_id) = update.vector_id {
            let previous = slice.vector_id.replace(vector_id);
            if previous != slice.vector_id {
                replaced_vector_id = previous;
            }
        }

        self.database.update_slice(&slice).await?;

        if let Some(old_id) = replaced_vector_id {
            self.delete_replaced_vector(&slice.id, &old_id).await;
        }

        Ok(slice)
    }

    #[inline]
    pub async fn get_slice(&self, slice_id: &str) -> Result<Option<Slice>> {
        self.database.get_slice(slice_id).await
    }

    #[inline]
    pub async fn list_slice_vector_ids(&self, document_id: &str) -> Result<Vec<String>> {
        self.database.list_vector_ids_of_document(document_id).await
    }

    /// Removes every slice of a document, index entries first.
    ///
    /// Index-first ordering keeps the operation convergent under retry: if
    /// the process dies after the index delete, the rows (and their vector
    /// ids) are still there, and the next call re-issues idempotent deletes.
    /// Rows-first would lose the id list needed to clean the index. An index
    /// delete failure is logged and left to reconciliation; the relational
    /// delete still runs so the caller-visible invariant holds.
    #[inline]
    pub async fn remove_slices_of_document(&self, document_id: &str) -> Result<u64> {
        let vector_ids = self
            .database
            .list_vector_ids_of_document(document_id)
            .await?;

        if !vector_ids.is_empty() {
            if let Err(e) = self.vector_index.delete_many(&vector_ids).await {
                warn!(
                    "failed to delete [{}] vectors of document [{}], leaving to reconciliation: {}",
                    vector_ids.len(),
                    document_id,
                    e
                );
            }
        }

        let count = self.database.delete_slices_of_document(document_id).await?;
        debug!(
            "removed all slices of document [{}], count: [{}]",
            document_id, count
        );
        Ok(count)
    }

    async fn get_slice_required(&self, slice_id: &str) -> Result<Slice> {
        self.database
            .get_slice(slice_id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound {
                entity: "slice",
                id: slice_id.to_string(),
            })
    }

    /// Best-effort cleanup of a replaced index entry. Failure leaves one
    /// unreferenced vector behind, which the reconciliation sweep removes.
    async fn delete_replaced_vector(&self, slice_id: &str, old_vector_id: &str) {
        let ids = vec![old_vector_id.to_string()];
        if let Err(e) = self.vector_index.delete_many(&ids).await {
            warn!(
                "failed to delete replaced vector [{}] of slice [{}], leaving to reconciliation: {}",
                old_vector_id, slice_id, e
            );
        }
    }
}

/// Orchestrates document lifecycle, cascading deletion through
/// [`SliceSynchronizer`].
#[derive(Clone)]
pub struct DocumentSynchronizer {
    database: Database,
    slices: SliceSynchronizer,
}

impl DocumentSynchronizer {
    #[inline]
    pub fn new(database: Database, slices: SliceSynchronizer) -> Self {
        Self { database, slices }
    }

    /// Stamps the creation date server-side and inserts the row.
    #[inline]
    pub async fn create_document(&self, new_doc: NewDocument) -> Result<Document> {
        let doc = Document {
            id: new_doc.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: new_doc.title,
            origin: new_doc.origin,
            created_date: Utc::now().naive_utc(),
        };

        self.database.insert_document(&doc).await?;
        debug!("created document [{}]", doc.id);
        Ok(doc)
    }

    /// Updates mutable fields only; identifier and creation date are fixed.
    #[inline]
    pub async fn update_document(
        &self,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document> {
        let mut doc = self
            .database
            .get_document(document_id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound {
                entity: "document",
                id: document_id.to_string(),
            })?;

        if let Some(title) = update.title {
            doc.title = title;
        }
        if let Some(origin) = update.origin {
            doc.origin = Some(origin);
        }

        self.database.update_document(&doc).await?;
        Ok(doc)
    }

    #[inline]
    pub async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        self.database.get_document(document_id).await
    }

    /// Deletes a document after cascading through its slices.
    ///
    /// Slice cleanup runs to completion before the document row goes away; if
    /// it fails the row is retained and the call can be retried, which is
    /// safe because slice cleanup is idempotent. Returns whether a document
    /// row was actually removed, so a retry after success reports false.
    #[inline]
    pub async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let removed_slices = self.slices.remove_slices_of_document(document_id).await?;

        let removed = self.database.delete_document(document_id).await?;
        if removed {
            info!(
                "deleted document [{}], slices removed: [{}]",
                document_id, removed_slices
            );
        }
        Ok(removed)
    }
}
