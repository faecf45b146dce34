//! PostgreSQL session backend over sqlx transactions.
//!
//! Tables are created by the platform's deployment tooling; this backend
//! only reads and writes rows. SQL is built dynamically from row maps with
//! quoted identifiers, mirroring how the admin frontend shapes its payloads.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, Transaction};

use crate::config::config;
use crate::storage::session::{OrmSession, PersistenceError, SessionFactory, TupleRow};

pub struct PgSessionFactory {
    pool: PgPool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a factory from `DATABASE_URL`, applying the configured pool
    /// limits.
    pub async fn from_env() -> Result<Self, PersistenceError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| PersistenceError::ConfigMissing("DATABASE_URL"))?;

        let db = &config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout))
            .connect(&url)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn begin(&self) -> Result<Box<dyn OrmSession>, PersistenceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }
}

struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrmSession for PgSession {
    async fn insert(&mut self, table: &str, row: TupleRow) -> Result<TupleRow, PersistenceError> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (column, value) in row {
            if column == "id" {
                continue;
            }
            columns.push(column);
            values.push(value);
        }

        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING *",
                quote_identifier(table)
            )
        } else {
            let column_list = columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=values.len())
                .map(|i| format!("${}", i))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quote_identifier(table),
                column_list,
                placeholders
            )
        };

        if config().database.enable_query_logging {
            tracing::debug!(table, sql = %sql, "insert");
        }

        let mut q = sqlx::query(&sql);
        for value in &values {
            q = bind_value(q, value);
        }
        let pg_row = q.fetch_one(&mut *self.tx).await?;
        Ok(row_to_map(&pg_row))
    }

    async fn select_all(&mut self, table: &str) -> Result<Vec<TupleRow>, PersistenceError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY \"id\"",
            quote_identifier(table)
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn select_by_id(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<TupleRow>, PersistenceError> {
        let sql = format!(
            "SELECT * FROM {} WHERE \"id\" = $1",
            quote_identifier(table)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.as_ref().map(row_to_map))
    }

    async fn select_where(
        &mut self,
        table: &str,
        filter: &TupleRow,
    ) -> Result<Vec<TupleRow>, PersistenceError> {
        if filter.is_empty() {
            return self.select_all(table).await;
        }

        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for (i, (column, value)) in filter.iter().enumerate() {
            clauses.push(format!("{} = ${}", quote_identifier(column), i + 1));
            values.push(value.clone());
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY \"id\"",
            quote_identifier(table),
            clauses.join(" AND ")
        );

        let mut q = sqlx::query(&sql);
        for value in &values {
            q = bind_value(q, value);
        }
        let rows = q.fetch_all(&mut *self.tx).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn update(
        &mut self,
        table: &str,
        id: i64,
        changes: TupleRow,
    ) -> Result<TupleRow, PersistenceError> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (column, value) in changes {
            if column == "id" {
                continue;
            }
            assignments.push(format!(
                "{} = ${}",
                quote_identifier(&column),
                values.len() + 1
            ));
            values.push(value);
        }

        if assignments.is_empty() {
            return self
                .select_by_id(table, id)
                .await?
                .ok_or_else(|| PersistenceError::NotFound(format!("{}#{}", table, id)));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING *",
            quote_identifier(table),
            assignments.join(", "),
            values.len() + 1
        );

        if config().database.enable_query_logging {
            tracing::debug!(table, id, sql = %sql, "update");
        }

        let mut q = sqlx::query(&sql);
        for value in &values {
            q = bind_value(q, value);
        }
        let row = q.bind(id).fetch_optional(&mut *self.tx).await?;
        row.as_ref()
            .map(row_to_map)
            .ok_or_else(|| PersistenceError::NotFound(format!("{}#{}", table, id)))
    }

    async fn delete(&mut self, table: &str, id: i64) -> Result<bool, PersistenceError> {
        let sql = format!(
            "DELETE FROM {} WHERE \"id\" = $1",
            quote_identifier(table)
        );
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        self.tx
            .commit()
            .await
            .map_err(|e| PersistenceError::CommitFailed(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), PersistenceError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_value<'q>(
    q: Query<'q, Postgres, PgArguments>,
    v: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

/// Convert a database row to a JSON map, falling back through the scalar
/// types the two plugin tables actually use.
fn row_to_map(row: &PgRow) -> TupleRow {
    let mut map = Map::new();
    for i in 0..row.len() {
        let column_name = row.column(i).name();

        let json_value = match row.try_get::<Option<Value>, _>(i) {
            Ok(Some(v)) => v,
            Ok(None) => Value::Null,
            Err(_) => {
                if let Ok(s) = row.try_get::<Option<String>, _>(i) {
                    s.map(Value::String).unwrap_or(Value::Null)
                } else if let Ok(n) = row.try_get::<Option<i64>, _>(i) {
                    n.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
                } else if let Ok(n) = row.try_get::<Option<i32>, _>(i) {
                    n.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
                } else if let Ok(f) = row.try_get::<Option<f64>, _>(i) {
                    f.and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                } else if let Ok(b) = row.try_get::<Option<bool>, _>(i) {
                    b.map(Value::Bool).unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
        };

        map.insert(column_name.to_string(), json_value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("DiagramTrace"), "\"DiagramTrace\"");
        assert_eq!(quote_identifier("bad\"name"), "\"bad\"\"name\"");
    }
}
