use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::Result;
use crate::database::sqlite::models::{Document, Slice};
use crate::database::sqlite::queries::{DocumentQueries, SliceQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Handle to the relational record store. Cheap to clone; every operation
/// runs in its own implicit transaction on the shared pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn from_config(config: &crate::config::Config) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config.base_dir.display()
            )
        })?;

        let options = SqliteConnectOptions::new()
            .filename(config.database_path())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.storage.max_connections)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    // Document operations
    pub async fn insert_document(&self, doc: &Document) -> Result<()> {
        DocumentQueries::insert(&self.pool, doc).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    pub async fn update_document(&self, doc: &Document) -> Result<()> {
        DocumentQueries::update_by_id(&self.pool, doc).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        DocumentQueries::delete_by_id(&self.pool, id).await
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentQueries::list_all(&self.pool).await
    }

    // Slice operations
    pub async fn insert_slice(&self, slice: &Slice) -> Result<()> {
        SliceQueries::insert(&self.pool, slice).await
    }

    pub async fn get_slice(&self, id: &str) -> Result<Option<Slice>> {
        SliceQueries::get_by_id(&self.pool, id).await
    }

    pub async fn update_slice(&self, slice: &Slice) -> Result<()> {
        SliceQueries::update_by_id(&self.pool, slice).await
    }

    pub async fn list_vector_ids_of_document(&self, document_id: &str) -> Result<Vec<String>> {
        SliceQueries::list_vector_ids_of_document(&self.pool, document_id).await
    }

    pub async fn list_all_vector_ids(&self) -> Result<Vec<String>> {
        SliceQueries::list_all_vector_ids(&self.pool).await
    }

    pub async fn delete_slices_of_document(&self, document_id: &str) -> Result<u64> {
        SliceQueries::delete_all_of_document(&self.pool, document_id).await
    }

    pub async fn count_slices_of_document(&self, document_id: &str) -> Result<i64> {
        SliceQueries::count_of_document(&self.pool, document_id).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
