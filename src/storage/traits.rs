//! Storage trait definitions

use crate::document::Document;
use crate::model::ItemId;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during archive operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(ItemId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document id: {0}")]
    IdParse(String),
}

/// Result type for archive operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for document archive backends.
///
/// An archive persists serialized documents between processing sessions;
/// it is distinct from the in-session `Store`, which stays append-only.
/// Implementations must be thread-safe (Send + Sync).
pub trait DocArchive: Send + Sync {
    /// Save a document (insert or replace)
    fn save_doc(&self, doc: &Document) -> StorageResult<()>;

    /// Load a document by id
    fn load_doc(&self, id: &ItemId) -> StorageResult<Option<Document>>;

    /// Delete a document; returns whether it existed
    fn delete_doc(&self, id: &ItemId) -> StorageResult<bool>;

    /// List all archived document ids
    fn list_docs(&self) -> StorageResult<Vec<ItemId>>;
}

/// Extension trait for opening archives from paths
pub trait OpenArchive: DocArchive + Sized {
    /// Open or create an archive at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory archive (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
