#[cfg(test)]
mod tests;

use super::models::*;
use crate::{KnowledgeError, Result};
use sqlx::SqlitePool;
use tracing::debug;

fn map_insert_error(
    e: sqlx::Error,
    entity: &'static str,
    id: &str,
    owning_document: Option<&str>,
) -> KnowledgeError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return KnowledgeError::Conflict {
                entity,
                id: id.to_string(),
            };
        }
        // A foreign-key violation means the referenced document is missing,
        // so the error names that document, not the row being inserted.
        if db_err.is_foreign_key_violation() {
            if let Some(document_id) = owning_document {
                return KnowledgeError::NotFound {
                    entity: "document",
                    id: document_id.to_string(),
                };
            }
        }
    }
    KnowledgeError::Database(e.to_string())
}

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn insert(pool: &SqlitePool, doc: &Document) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (id, title, origin, created_date) VALUES (?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.origin)
        .bind(doc.created_date)
        .execute(pool)
        .await
        .map_err(|e| map_insert_error(e, "document", &doc.id, None))?;

        Ok(())
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
        let result = sqlx::query_as::<_, Document>(
            "SELECT id, title, origin, created_date FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(result)
    }

    /// Updates mutable fields only. Identifier and creation date are immutable.
    #[inline]
    pub async fn update_by_id(pool: &SqlitePool, doc: &Document) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET title = ?, origin = ? WHERE id = ?")
            .bind(&doc.title)
            .bind(&doc.origin)
            .bind(&doc.id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KnowledgeError::NotFound {
                entity: "document",
                id: doc.id.clone(),
            });
        }

        Ok(())
    }

    #[inline]
    pub async fn delete_by_id(pool: &SqlitePool, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(
            "SELECT id, title, origin, created_date FROM documents ORDER BY created_date DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(docs)
    }
}

pub struct SliceQueries;

impl SliceQueries {
    #[inline]
    pub async fn insert(pool: &SqlitePool, slice: &Slice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO slices (id, document_id, content, word_count, vector_id, enabled, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&slice.id)
        .bind(&slice.document_id)
        .bind(&slice.content)
        .bind(slice.word_count)
        .bind(&slice.vector_id)
        .bind(slice.enabled)
        .bind(slice.created_date)
        .execute(pool)
        .await
        .map_err(|e| map_insert_error(e, "slice", &slice.id, Some(&slice.document_id)))?;

        Ok(())
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Slice>> {
        let result = sqlx::query_as::<_, Slice>(
            r#"
            SELECT id, document_id, content, word_count, vector_id, enabled, created_date
            FROM slices WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(result)
    }

    /// Writes every mutable column of the row. Identifier, owning document
    /// and creation date are immutable.
    #[inline]
    pub async fn update_by_id(pool: &SqlitePool, slice: &Slice) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE slices SET content = ?, word_count = ?, vector_id = ?, enabled = ?
            WHERE id = ?
            "#,
        )
        .bind(&slice.content)
        .bind(slice.word_count)
        .bind(&slice.vector_id)
        .bind(slice.enabled)
        .bind(&slice.id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KnowledgeError::NotFound {
                entity: "slice",
                id: slice.id.clone(),
            });
        }

        Ok(())
    }

    /// Registered vector ids for a document's slices. Rows still awaiting
    /// registration carry a NULL vector id and are skipped.
    #[inline]
    pub async fn list_vector_ids_of_document(
        pool: &SqlitePool,
        document_id: &str,
    ) -> Result<Vec<String>> {
        let vector_ids = sqlx::query_scalar::<_, String>(
            "SELECT vector_id FROM slices WHERE document_id = ? AND vector_id IS NOT NULL",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await?;

        debug!(
            "slices of document [{}], registered vector ids: [{}]",
            document_id,
            vector_ids.len()
        );
        Ok(vector_ids)
    }

    /// Every registered vector id in the store, for reconciliation audits.
    #[inline]
    pub async fn list_all_vector_ids(pool: &SqlitePool) -> Result<Vec<String>> {
        let vector_ids = sqlx::query_scalar::<_, String>(
            "SELECT vector_id FROM slices WHERE vector_id IS NOT NULL",
        )
        .fetch_all(pool)
        .await?;

        Ok(vector_ids)
    }

    /// Removes every slice of the document in one statement, so the
    /// relational side is all-or-nothing.
    #[inline]
    pub async fn delete_all_of_document(pool: &SqlitePool, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM slices WHERE document_id = ?")
            .bind(document_id)
            .execute(pool)
            .await?;

        let count = result.rows_affected();
        debug!("removed all slices of document [{}], count: [{}]", document_id, count);
        Ok(count)
    }

    #[inline]
    pub async fn count_of_document(pool: &SqlitePool, document_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM slices WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
