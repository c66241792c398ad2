//! PostgreSQL table store.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use loader_common::{ColumnSpec, DataType, LoaderError, LoaderResult, Record, Value};

use crate::store::{
    check_arity, column_definitions, insert_prefix, quote_ident, rows_per_statement, TableStore,
};

/// PostgreSQL caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

/// Database connection pool and table operations.
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    /// Create a new store from a database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> LoaderResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Read back every row of a table, decoding columns by datatype.
    pub async fn fetch_rows(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<Vec<Record>> {
        let select = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select, quote_ident(name));

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Query failed: {}", e)))?;

        rows.iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let value = match c.datatype {
                            DataType::Boolean => row.try_get::<bool, _>(i).map(Value::Boolean),
                            DataType::Integer => row.try_get::<i64, _>(i).map(Value::Integer),
                            _ => row.try_get::<String, _>(i).map(Value::Text),
                        };
                        value.map_err(|e| LoaderError::DatabaseError(format!("Decode failed: {}", e)))
                    })
                    .collect::<LoaderResult<Vec<_>>>()
                    .map(Record::new)
            })
            .collect()
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
        DataType::Integer => "BIGINT",
        DataType::Unsupported(_) => "TEXT",
    }
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn table_exists(&self, name: &str) -> LoaderResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LoaderError::DatabaseError(format!("Query failed: {}", e)))
    }

    async fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<()> {
        let definitions = column_definitions(name, columns, sql_type)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(name),
            definitions
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Transaction failed: {}", e)))?;

        // IF NOT EXISTS alone races on the catalog under concurrent first use
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Lock failed: {}", e)))?;

        sqlx::query(&ddl)
            .execute(&mut *tx)
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Create table failed: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| LoaderError::DatabaseError(format!("Commit failed: {}", e)))?;

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
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
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
