//! SQLite archive backend

use super::traits::{DocArchive, OpenArchive, StorageError, StorageResult};
use crate::document::Document;
use crate::model::ItemId;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed document archive
///
/// Uses a single database file with one table of serialized documents.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteArchive {
    conn: Mutex<Connection>,
}

impl SqliteArchive {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                doc_json TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl OpenArchive for SqliteArchive {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl DocArchive for SqliteArchive {
    fn save_doc(&self, doc: &Document) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let doc_json = serde_json::to_string(doc)?;

        conn.execute(
            r#"
            INSERT INTO documents (id, doc_json, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                doc_json = excluded.doc_json,
                saved_at = excluded.saved_at
            "#,
            params![doc.id().to_string(), doc_json, Utc::now().to_rfc3339()],
        )?;
        debug!(doc = %doc.id(), "document archived");
        Ok(())
    }

    fn load_doc(&self, id: &ItemId) -> StorageResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        let doc_json: Option<String> = conn
            .query_row(
                "SELECT doc_json FROM documents WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(doc_json) = doc_json else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&doc_json)?))
    }

    fn delete_doc(&self, id: &ItemId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn list_docs(&self) -> StorageResult<Vec<ItemId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY saved_at, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            let id = raw
                .parse::<ItemId>()
                .map_err(|_| StorageError::IdParse(raw))?;
            ids.push(id);
        }
        Ok(ids)
    }
}
