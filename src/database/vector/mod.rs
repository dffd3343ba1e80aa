
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::{KnowledgeError, Result};

/// Client interface for the external vector index.
///
/// Both operations are idempotent: registering an existing id overwrites the
/// stored vector, deleting an unknown id is a no-op. The synchronizer's retry
/// policy depends on this, so implementations must preserve it.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Store `embedding` under `vector_id`, replacing any previous entry.
    async fn register(&self, vector_id: &str, embedding: &[f32]) -> Result<()>;

    /// Remove the given ids from the index. Unknown ids are skipped silently.
    async fn delete_many(&self, vector_ids: &[String]) -> Result<()>;
}

/// Process-local vector index keyed by id.
///
/// Backs embedded deployments and tests; similarity search is out of scope
/// here, this only satisfies the registration/deletion contract.
#[derive(Debug, Default)]
pub struct MemoryVectorIndex {
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl MemoryVectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, vector_id: &str) -> bool {
        self.lock_entries().contains_key(vector_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Snapshot of every registered id, for reconciliation audits.
    #[inline]
    pub fn vector_ids(&self) -> Vec<String> {
        self.lock_entries().keys().cloned().collect()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>> {
        // A poisoned lock means a writer panicked mid-insert; the map itself
        // is still a valid snapshot.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl VectorIndexClient for MemoryVectorIndex {
    async fn register(&self, vector_id: &str, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(KnowledgeError::VectorIndex(format!(
                "refusing to register empty embedding for id {vector_id}"
            )));
        }

        self.lock_entries()
            .insert(vector_id.to_string(), embedding.to_vec());
        debug!("registered vector [{}], dimension: [{}]", vector_id, embedding.len());
        Ok(())
    }

    async fn delete_many(&self, vector_ids: &[String]) -> Result<()> {
        let mut entries = self.lock_entries();
        let mut removed = 0usize;
        for vector_id in vector_ids {
            if entries.remove(vector_id).is_some() {
                removed += 1;
            }
        }
        debug!(
            "deleted vectors, requested: [{}], removed: [{}]",
            vector_ids.len(),
            removed
        );
        Ok(())
    }
}
