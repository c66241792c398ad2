//! The storage interface consumed by the ingestion pipeline.

use async_trait::async_trait;
use std::sync::Arc;

use loader_common::{ColumnSpec, LoaderError, LoaderResult, Record};

use crate::{PgTableStore, SqliteTableStore};

/// Table-level operations needed to load decoded records.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Check whether a table exists.
    async fn table_exists(&self, name: &str) -> LoaderResult<bool>;

    /// Create a table for the given columns.
    ///
    /// Idempotent: calling it for an existing table is not an error, and
    /// concurrent first use for the same name creates exactly one table.
    async fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<()>;

    /// Insert all records in one transaction.
    ///
    /// Either every record is committed or none is. Returns the number of
    /// rows inserted.
    async fn bulk_insert(
        &self,
        name: &str,
        column_names: &[String],
        records: &[Record],
    ) -> LoaderResult<u64>;

    /// Release pooled connections.
    async fn close(&self) {}
}

/// Connect to the backend selected by the URL scheme.
///
/// `postgres://` and `postgresql://` use PostgreSQL, `sqlite:` uses SQLite.
pub async fn connect(database_url: &str, max_connections: u32) -> LoaderResult<Arc<dyn TableStore>> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        let store = PgTableStore::connect(database_url, max_connections).await?;
        Ok(Arc::new(store))
    } else if database_url.starts_with("sqlite:") {
        let store = SqliteTableStore::open(database_url).await?;
        Ok(Arc::new(store))
    } else {
        // Never echo credentials back
        let scheme = database_url.split(':').next().unwrap_or_default();
        Err(LoaderError::UnsupportedUrl(format!("{}:...", scheme)))
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render the column list of a `CREATE TABLE` statement.
pub(crate) fn column_definitions(
    table: &str,
    columns: &[ColumnSpec],
    sql_type: impl Fn(&ColumnSpec) -> &'static str,
) -> LoaderResult<String> {
    if columns.is_empty() {
        return Err(LoaderError::InvalidTable {
            table: table.to_string(),
            message: "no columns".to_string(),
        });
    }

    Ok(columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c)))
        .collect::<Vec<_>>()
        .join(", "))
}

/// Check every record against the column list before touching the database.
pub(crate) fn check_arity(
    table: &str,
    column_names: &[String],
    records: &[Record],
) -> LoaderResult<()> {
    if column_names.is_empty() {
        return Err(LoaderError::InvalidTable {
            table: table.to_string(),
            message: "no columns".to_string(),
        });
    }

    for (row, record) in records.iter().enumerate() {
        if record.len() != column_names.len() {
            return Err(LoaderError::ArityMismatch {
                table: table.to_string(),
                row,
                found: record.len(),
                expected: column_names.len(),
            });
        }
    }

    Ok(())
}

/// Rows per INSERT statement so the bind parameter limit is never exceeded.
pub(crate) fn rows_per_statement(max_params: usize, columns: usize) -> usize {
    (max_params / columns.max(1)).max(1)
}

pub(crate) fn insert_prefix(table: &str, column_names: &[String]) -> String {
    let columns = column_names
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) ", quote_ident(table), columns)
}
