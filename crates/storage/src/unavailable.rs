//! Store used for a pass whose database could not be reached.
//!
//! Every call fails with the connection error, so groups that need the
//! database fail and stay in place while spec problems are still routed to
//! the hold areas.

use async_trait::async_trait;

use loader_common::{ColumnSpec, LoaderError, LoaderResult, Record};

use crate::store::TableStore;

pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> LoaderError {
        LoaderError::DatabaseError(format!("not connected: {}", self.reason))
    }
}

#[async_trait]
impl TableStore for UnavailableStore {
    async fn table_exists(&self, _name: &str) -> LoaderResult<bool> {
        Err(self.error())
    }

    async fn create_table(&self, _name: &str, _columns: &[ColumnSpec]) -> LoaderResult<()> {
        Err(self.error())
    }

    async fn bulk_insert(
        &self,
        _name: &str,
        _column_names: &[String],
        _records: &[Record],
    ) -> LoaderResult<u64> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader_common::DataType;

    #[tokio::test]
    async fn test_every_call_fails_with_reason() {
        let store = UnavailableStore::new("connection refused");

        match store.table_exists("t").await {
            Err(LoaderError::DatabaseError(msg)) => {
                assert_eq!(msg, "not connected: connection refused")
            }
            other => panic!("expected database error, got {:?}", other),
        }
        assert!(store
            .create_table("t", &[ColumnSpec::new("name", 4, DataType::Text)])
            .await
            .is_err());
        assert!(store.bulk_insert("t", &[], &[]).await.is_err());

        store.close().await;
    }
}
