//! SQLite table store.
//!
//! Used for local runs without a PostgreSQL server and for SQL-level tests
//! with an in-memory database.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use tokio::sync::Mutex;
use tracing::debug;

use loader_common::{ColumnSpec, DataType, LoaderError, LoaderResult, Record, Value};

use crate::store::{
    check_arity, column_definitions, insert_prefix, quote_ident, rows_per_statement, TableStore,
};

/// Conservative limit that holds for SQLite builds older than 3.32.
const MAX_BIND_PARAMS: usize = 999;

/// SQLite-backed table store.
pub struct SqliteTableStore {
    pool: SqlitePool,
    create_lock: Mutex<()>,
}

impl SqliteTableStore {
    /// Open or create the database named by a `sqlite:` URL.
    pub async fn open(database_url: &str) -> LoaderResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| LoaderError::DatabaseError(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Failed to open SQLite database: {}", e)))?;

        Ok(Self::from_pool(pool))
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> LoaderResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // Every connection gets its own memory database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Failed to open SQLite database: {}", e)))?;

        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            create_lock: Mutex::new(()),
        }
    }

    /// Read back every row of a table, decoding columns by datatype.
    pub async fn fetch_rows(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<Vec<Record>> {
        let select = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {} ORDER BY rowid", select, quote_ident(name));

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Query failed: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let value = match column.datatype {
                    DataType::Boolean => row.try_get::<bool, _>(i).map(Value::Boolean),
                    DataType::Integer => row.try_get::<i64, _>(i).map(Value::Integer),
                    _ => row.try_get::<String, _>(i).map(Value::Text),
                }
                .map_err(|e| LoaderError::DatabaseError(format!("Decode failed: {}", e)))?;
                values.push(value);
            }
            records.push(Record::new(values));
        }

        Ok(records)
    }

    /// Drop a table if it exists.
    pub async fn drop_table(&self, name: &str) -> LoaderResult<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&self.pool)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Drop failed: {}", e)))?;

        Ok(())
    }
}

fn sql_type(column: &ColumnSpec) -> &'static str {
    match column.datatype {
        DataType::Text => "TEXT",
        DataType::Boolean => "BOOLEAN",
        DataType::Integer => "INTEGER",
        DataType::Unsupported(_) => "TEXT",
    }
}

#[async_trait]
impl TableStore for SqliteTableStore {
    async fn table_exists(&self, name: &str) -> LoaderResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LoaderError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(count > 0)
    }

    async fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<()> {
        let definitions = column_definitions(name, columns, sql_type)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(name),
            definitions
        );

        let _guard = self.create_lock.lock().await;
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Create table failed: {}", e)))?;

        debug!(table = %name, columns = columns.len(), "Ensured table");
        Ok(())
    }

    async fn bulk_insert(
        &self,
        name: &str,
        column_names: &[String],
        records: &[Record],
    ) -> LoaderResult<u64> {
        check_arity(name, column_names, records)?;
        if records.is_empty() {
            return Ok(0);
        }

        let prefix = insert_prefix(name, column_names);
        let chunk_rows = rows_per_statement(MAX_BIND_PARAMS, column_names.len());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Transaction failed: {}", e)))?;

        let mut inserted = 0u64;
        for chunk in records.chunks(chunk_rows) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut row, record| {
                for value in record.values() {
                    match value {
                        Value::Text(s) => {
                            row.push_bind(s.clone());
                        }
                        Value::Boolean(b) => {
                            row.push_bind(*b);
                        }
                        Value::Integer(i) => {
                            row.push_bind(*i);
                        }
                    }
                }
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| LoaderError::DatabaseError(format!("Insert failed: {}", e)))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Commit failed: {}", e)))?;

        debug!(table = %name, rows = inserted, "Inserted rows");
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testformat1_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name", 10, DataType::Text),
            ColumnSpec::new("valid", 1, DataType::Boolean),
            ColumnSpec::new("count", 3, DataType::Integer),
        ]
    }

    fn names(columns: &[ColumnSpec]) -> Vec<String> {
        columns.iter().map(|c| c.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = testformat1_columns();

        assert!(!store.table_exists("testformat1").await.unwrap());

        store.create_table("testformat1", &columns).await.unwrap();
        store.create_table("testformat1", &columns).await.unwrap();

        assert!(store.table_exists("testformat1").await.unwrap());

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'testformat1'",
        )
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_bulk_insert_and_fetch() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = testformat1_columns();
        store.create_table("testformat1", &columns).await.unwrap();

        let records = vec![
            Record::new(vec!["Foonyor".into(), true.into(), 1i64.into()]),
            Record::new(vec!["Barzane".into(), false.into(), (-12i64).into()]),
            Record::new(vec!["Quuxitude".into(), true.into(), 103i64.into()]),
        ];

        let inserted = store
            .bulk_insert("testformat1", &names(&columns), &records)
            .await
            .unwrap();
        assert_eq!(inserted, 3);

        let rows = store.fetch_rows("testformat1", &columns).await.unwrap();
        assert_eq!(rows, records);
    }

    #[tokio::test]
    async fn test_values_with_quotes_are_bound() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = vec![ColumnSpec::new("note", 20, DataType::Text)];
        store.create_table("notes", &columns).await.unwrap();

        let records = vec![Record::new(vec!["O'Brien'); DROP".into()])];
        store
            .bulk_insert("notes", &names(&columns), &records)
            .await
            .unwrap();

        let rows = store.fetch_rows("notes", &columns).await.unwrap();
        assert_eq!(rows, records);
        assert!(store.table_exists("notes").await.unwrap());
    }

    #[tokio::test]
    async fn test_large_insert_spans_statements() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = testformat1_columns();
        store.create_table("bulk", &columns).await.unwrap();

        let records: Vec<Record> = (0..1000i64)
            .map(|i| Record::new(vec![format!("row{}", i).into(), (i % 2 == 0).into(), i.into()]))
            .collect();

        let inserted = store
            .bulk_insert("bulk", &names(&columns), &records)
            .await
            .unwrap();
        assert_eq!(inserted, 1000);

        let rows = store.fetch_rows("bulk", &columns).await.unwrap();
        assert_eq!(rows.len(), 1000);
        assert_eq!(rows[999], records[999]);
    }

    #[tokio::test]
    async fn test_insert_into_missing_table_fails() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let records = vec![Record::new(vec!["x".into()])];

        let result = store
            .bulk_insert("missing", &["name".to_string()], &records)
            .await;
        assert!(matches!(result, Err(LoaderError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_failed_insert_commits_nothing() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = testformat1_columns();
        store.create_table("testformat1", &columns).await.unwrap();

        // Second record is short; nothing from this call may land
        let records = vec![
            Record::new(vec!["Foonyor".into(), true.into(), 1i64.into()]),
            Record::new(vec!["Barzane".into()]),
        ];
        let result = store
            .bulk_insert("testformat1", &names(&columns), &records)
            .await;
        assert!(matches!(result, Err(LoaderError::ArityMismatch { row: 1, .. })));

        let rows = store.fetch_rows("testformat1", &columns).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_empty_insert_is_noop() {
        let store = SqliteTableStore::open_memory().await.unwrap();
        let columns = testformat1_columns();
        store.create_table("testformat1", &columns).await.unwrap();

        let inserted = store
            .bulk_insert("testformat1", &names(&columns), &[])
            .await
            .unwrap();
        assert_eq!(inserted, 0);

        store.drop_table("testformat1").await.unwrap();
        assert!(!store.table_exists("testformat1").await.unwrap());
    }
}
