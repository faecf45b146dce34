use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire representation of one persisted record: column name to scalar value.
pub type TupleRow = Map<String, Value>;

/// Errors from the persistence layer.
///
/// A failed commit aborts the whole mutation; callers must treat the record
/// as unchanged and must not emit any downstream notification.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Opens transactional sessions. One factory per backing database.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrmSession>, PersistenceError>;
}

/// One open transaction.
///
/// All row operations stage work inside the transaction; nothing is visible
/// to other sessions until `commit`. Dropping a session without committing
/// discards its writes.
#[async_trait]
pub trait OrmSession: Send {
    /// Insert a row, assigning the primary key. Any `id` in the payload is
    /// ignored. Returns the stored row including the new key.
    async fn insert(&mut self, table: &str, row: TupleRow) -> Result<TupleRow, PersistenceError>;

    async fn select_all(&mut self, table: &str) -> Result<Vec<TupleRow>, PersistenceError>;

    async fn select_by_id(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<TupleRow>, PersistenceError>;

    /// Select rows whose columns equal every entry of `filter`.
    async fn select_where(
        &mut self,
        table: &str,
        filter: &TupleRow,
    ) -> Result<Vec<TupleRow>, PersistenceError>;

    /// Merge `changes` into the row with the given key. Returns the updated
    /// row, or `NotFound` if the key does not exist.
    async fn update(
        &mut self,
        table: &str,
        id: i64,
        changes: TupleRow,
    ) -> Result<TupleRow, PersistenceError>;

    /// Returns true if a row was removed.
    async fn delete(&mut self, table: &str, id: i64) -> Result<bool, PersistenceError>;

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError>;

    async fn rollback(self: Box<Self>) -> Result<(), PersistenceError>;
}
