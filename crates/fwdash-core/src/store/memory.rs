use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{Filter, RecordStore, Row, StoreError, Table, Tables};

/// Volatile store for tests and throwaway sessions.
///
/// Counts successful writes so callers can assert that a rejected
/// operation never reached persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `add`/`update`/`delete` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Simulate losing the backing database: every call fails until
    /// switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn write<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Tables) -> Result<(), StoreError>,
    {
        self.check_online()?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        op(&mut tables)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, table: Table, filter: Option<&Filter>) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        debug!(%table, ?filter, "memory store read");
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(tables.select(table, filter))
    }

    async fn add(&self, table: Table, row: Row) -> Result<(), StoreError> {
        self.write(|t| t.insert(table, row))
    }

    async fn update(&self, table: Table, filter: &Filter, body: Row) -> Result<(), StoreError> {
        self.write(|t| t.merge(table, filter, &body))
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), StoreError> {
        self.write(|t| t.remove(table, filter))
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn counts_only_successful_writes() {
        let store = MemoryStore::new();
        let row = json!({"id": "s1", "name": "HQ"}).as_object().cloned().unwrap();

        store.add(Table::Sites, row.clone()).await.unwrap();
        assert!(store.add(Table::Sites, row).await.is_err());
        assert_eq!(store.writes(), 1);

        assert_eq!(store.read(Table::Sites, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(store.test_connection().await.is_err());
        assert!(store.read(Table::Devices, None).await.is_err());
        store.set_offline(false);
        assert!(store.test_connection().await.is_ok());
    }
}
