//! Persistence backends
//!
//! Documents persist between processing sessions through the `DocArchive`
//! trait. The primary implementation is `SqliteArchive`.

mod sqlite;
mod traits;

pub use sqlite::SqliteArchive;
pub use traits::{DocArchive, OpenArchive, StorageError, StorageResult};
