//! In-memory session backend.
//!
//! Backs the integration tests and standalone demos. Sessions read from a
//! snapshot taken at `begin` and keep an operation log that is replayed into
//! the shared store at `commit`, so uncommitted work is never visible to
//! other sessions. Commit faults can be injected to exercise failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::storage::session::{OrmSession, PersistenceError, SessionFactory, TupleRow};

#[derive(Debug, Clone, Default)]
struct TableData {
    rows: BTreeMap<i64, TupleRow>,
    next_id: i64,
}

impl TableData {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared row store behind all sessions of one `MemorySessionFactory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, TableData>>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    /// Make the next `commit` on any session of this store fail once.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn take_commit_fault(&self) -> bool {
        self.fail_next_commit.swap(false, Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct MemorySessionFactory {
    store: Arc<MemoryStore>,
}

impl MemorySessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn begin(&self) -> Result<Box<dyn OrmSession>, PersistenceError> {
        let staged = self.store.tables.lock().expect("store poisoned").clone();
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.store),
            staged,
            ops: Vec::new(),
        }))
    }
}

#[derive(Debug)]
enum StagedOp {
    Upsert { table: String, id: i64, row: TupleRow },
    Delete { table: String, id: i64 },
}

struct MemorySession {
    store: Arc<MemoryStore>,
    staged: HashMap<String, TableData>,
    ops: Vec<StagedOp>,
}

impl MemorySession {
    fn table(&mut self, name: &str) -> &mut TableData {
        self.staged.entry(name.to_string()).or_default()
    }
}

#[async_trait]
impl OrmSession for MemorySession {
    async fn insert(&mut self, table: &str, row: TupleRow) -> Result<TupleRow, PersistenceError> {
        // Reserve the key in the shared store so concurrent sessions never
        // collide, even if this transaction later rolls back.
        let id = {
            let mut tables = self.store.tables.lock().expect("store poisoned");
            tables.entry(table.to_string()).or_default().allocate_id()
        };

        let mut stored = row;
        stored.insert("id".to_string(), Value::from(id));

        let data = self.table(table);
        data.next_id = data.next_id.max(id);
        data.rows.insert(id, stored.clone());
        self.ops.push(StagedOp::Upsert {
            table: table.to_string(),
            id,
            row: stored.clone(),
        });

        Ok(stored)
    }

    async fn select_all(&mut self, table: &str) -> Result<Vec<TupleRow>, PersistenceError> {
        Ok(self.table(table).rows.values().cloned().collect())
    }

    async fn select_by_id(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<TupleRow>, PersistenceError> {
        Ok(self.table(table).rows.get(&id).cloned())
    }

    async fn select_where(
        &mut self,
        table: &str,
        filter: &TupleRow,
    ) -> Result<Vec<TupleRow>, PersistenceError> {
        let rows = self
            .table(table)
            .rows
            .values()
            .filter(|row| {
                filter
                    .iter()
                    .all(|(column, wanted)| row.get(column) == Some(wanted))
            })
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn update(
        &mut self,
        table: &str,
        id: i64,
        changes: TupleRow,
    ) -> Result<TupleRow, PersistenceError> {
        let data = self.table(table);
        let row = data
            .rows
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::NotFound(format!("{}#{}", table, id)))?;

        for (column, value) in changes {
            if column == "id" {
                continue;
            }
            row.insert(column, value);
        }

        let updated = row.clone();
        self.ops.push(StagedOp::Upsert {
            table: table.to_string(),
            id,
            row: updated.clone(),
        });
        Ok(updated)
    }

    async fn delete(&mut self, table: &str, id: i64) -> Result<bool, PersistenceError> {
        let removed = self.table(table).rows.remove(&id).is_some();
        if removed {
            self.ops.push(StagedOp::Delete {
                table: table.to_string(),
                id,
            });
        }
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        if self.store.take_commit_fault() {
            return Err(PersistenceError::CommitFailed(
                "simulated commit failure".to_string(),
            ));
        }

        let mut tables = self.store.tables.lock().expect("store poisoned");
        for op in self.ops {
            match op {
                StagedOp::Upsert { table, id, row } => {
                    let data = tables.entry(table).or_default();
                    data.next_id = data.next_id.max(id);
                    data.rows.insert(id, row);
                }
                StagedOp::Delete { table, id } => {
                    tables.entry(table).or_default().rows.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(title: &str) -> TupleRow {
        match json!({ "title": title }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.begin().await.unwrap();

        let first = session.insert("Trace", row("a")).await.unwrap();
        let second = session.insert("Trace", row("b")).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(first.get("id"), Some(&json!(1)));
        assert_eq!(second.get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let factory = MemorySessionFactory::new();

        let mut writer = factory.begin().await.unwrap();
        writer.insert("Trace", row("draft")).await.unwrap();

        let mut reader = factory.begin().await.unwrap();
        assert!(reader.select_all("Trace").await.unwrap().is_empty());

        writer.commit().await.unwrap();

        let mut reader = factory.begin().await.unwrap();
        assert_eq!(reader.select_all("Trace").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_ops() {
        let factory = MemorySessionFactory::new();

        let mut session = factory.begin().await.unwrap();
        session.insert("Trace", row("gone")).await.unwrap();
        session.rollback().await.unwrap();

        let mut reader = factory.begin().await.unwrap();
        assert!(reader.select_all("Trace").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_and_preserves_id() {
        let factory = MemorySessionFactory::new();

        let mut session = factory.begin().await.unwrap();
        let inserted = session.insert("Trace", row("before")).await.unwrap();
        session.commit().await.unwrap();
        let id = inserted.get("id").and_then(Value::as_i64).unwrap();

        let mut session = factory.begin().await.unwrap();
        let mut changes = TupleRow::new();
        changes.insert("title".to_string(), json!("after"));
        changes.insert("id".to_string(), json!(999));
        let updated = session.update("Trace", id, changes).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(updated.get("id"), Some(&json!(id)));
        assert_eq!(updated.get("title"), Some(&json!("after")));
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.begin().await.unwrap();

        let result = session.update("Trace", 42, row("nope")).await;
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn injected_commit_fault_fires_once() {
        let factory = MemorySessionFactory::new();
        factory.store().fail_next_commit();

        let mut session = factory.begin().await.unwrap();
        session.insert("Trace", row("lost")).await.unwrap();
        let result = session.commit().await;
        assert!(matches!(result, Err(PersistenceError::CommitFailed(_))));

        // Fault is consumed; the next transaction goes through.
        let mut session = factory.begin().await.unwrap();
        session.insert("Trace", row("kept")).await.unwrap();
        session.commit().await.unwrap();

        let mut reader = factory.begin().await.unwrap();
        let rows = reader.select_all("Trace").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&json!("kept")));
    }

    #[tokio::test]
    async fn select_where_filters_on_equality() {
        let factory = MemorySessionFactory::new();

        let mut session = factory.begin().await.unwrap();
        let mut a = row("one");
        a.insert("modelSetKey".to_string(), json!("ms1"));
        let mut b = row("two");
        b.insert("modelSetKey".to_string(), json!("ms2"));
        session.insert("Trace", a).await.unwrap();
        session.insert("Trace", b).await.unwrap();
        session.commit().await.unwrap();

        let mut reader = factory.begin().await.unwrap();
        let mut filter = TupleRow::new();
        filter.insert("modelSetKey".to_string(), json!("ms2"));
        let rows = reader.select_where("Trace", &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&json!("two")));
    }
}
