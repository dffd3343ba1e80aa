use thiserror::Error;

pub type Result<T> = std::result::Result<T, KnowledgeError>;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl KnowledgeError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnowledgeError::NotFound { .. })
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, KnowledgeError::Conflict { .. })
    }
}

impl From<sqlx::Error> for KnowledgeError {
    #[inline]
    fn from(e: sqlx::Error) -> Self {
        KnowledgeError::Database(e.to_string())
    }
}

pub mod config;
pub mod database;
pub mod sync;
