//! In-memory table store.
//!
//! Records every call so pipeline tests can assert which storage operations
//! were (or were not) made, and can be told to fail inserts.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use loader_common::{ColumnSpec, LoaderError, LoaderResult, Record};

use crate::store::{check_arity, TableStore};

/// A storage call observed by [`MemoryTableStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    TableExists(String),
    CreateTable(String),
    BulkInsert { table: String, rows: usize },
}

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<ColumnSpec>,
    rows: Vec<Record>,
}

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, MemoryTable>,
    calls: Vec<StoreCall>,
    insert_failure: Option<String>,
}

/// Table store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryTableStore {
    inner: Mutex<Inner>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every following `bulk_insert` fail with the given message.
    pub fn fail_inserts(&self, message: impl Into<String>) {
        self.lock().insert_failure = Some(message.into());
    }

    /// Rows currently stored in a table.
    pub fn rows(&self, name: &str) -> Option<Vec<Record>> {
        self.lock().tables.get(name).map(|t| t.rows.clone())
    }

    /// Column definitions a table was created with.
    pub fn columns(&self, name: &str) -> Option<Vec<ColumnSpec>> {
        self.lock().tables.get(name).map(|t| t.columns.clone())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Calls that touched the given table.
    pub fn calls_for(&self, name: &str) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| match call {
                StoreCall::TableExists(t) | StoreCall::CreateTable(t) => t == name,
                StoreCall::BulkInsert { table, .. } => table == name,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn table_exists(&self, name: &str) -> LoaderResult<bool> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::TableExists(name.to_string()));
        Ok(inner.tables.contains_key(name))
    }

    async fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> LoaderResult<()> {
        if columns.is_empty() {
            return Err(LoaderError::InvalidTable {
                table: name.to_string(),
                message: "no columns".to_string(),
            });
        }

        let mut inner = self.lock();
        inner.calls.push(StoreCall::CreateTable(name.to_string()));
        inner
            .tables
            .entry(name.to_string())
            .or_insert_with(|| MemoryTable {
                columns: columns.to_vec(),
                rows: Vec::new(),
            });
        Ok(())
    }

    async fn bulk_insert(
        &self,
        name: &str,
        column_names: &[String],
        records: &[Record],
    ) -> LoaderResult<u64> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::BulkInsert {
            table: name.to_string(),
            rows: records.len(),
        });

        if let Some(message) = &inner.insert_failure {
            return Err(LoaderError::DatabaseError(message.clone()));
        }
        check_arity(name, column_names, records)?;

        let table = inner
            .tables
            .get_mut(name)
            .ok_or_else(|| LoaderError::TableMissing(name.to_string()))?;

        let known: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        if known != column_names.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(LoaderError::InvalidTable {
                table: name.to_string(),
                message: format!("columns {:?} do not match table columns {:?}", column_names, known),
            });
        }

        table.rows.extend_from_slice(records);
        Ok(records.len() as u64)
    }
}
