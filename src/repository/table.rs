//! Generic table of JSON records on top of a [`StorageBackend`]
//!
//! Layout for a table named `t`:
//! - `t/_table.json` holds the [`TableMeta`] marker (written by migrations)
//! - `t/{id:020}.json` holds one record; ids are zero-padded so key order
//!   matches id order

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{Record, RecordId};
use crate::storage::StorageBackend;
use crate::{Error, Result};

const META_FILE: &str = "_table.json";

/// Table marker persisted next to the records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub next_id: RecordId,
    pub created_at: DateTime<Utc>,
}

fn meta_key(table: &str) -> String {
    format!("{}/{}", table, META_FILE)
}

fn record_key(table: &str, id: RecordId) -> String {
    format!("{}/{:020}.json", table, id)
}

/// Create the table marker if it does not exist yet.
pub async fn create_table(storage: &dyn StorageBackend, table: &str) -> Result<bool> {
    let key = meta_key(table);
    if storage.exists(&key).await? {
        return Ok(false);
    }

    let meta = TableMeta {
        name: table.to_string(),
        next_id: 1,
        created_at: Utc::now(),
    };
    storage
        .put(&key, Bytes::from(serde_json::to_vec_pretty(&meta)?))
        .await?;
    Ok(true)
}

/// Remove every record of the table, then its marker.
pub async fn drop_table(storage: &dyn StorageBackend, table: &str) -> Result<bool> {
    let key = meta_key(table);
    if !storage.exists(&key).await? {
        return Ok(false);
    }

    for record in storage.list(table).await? {
        if record != key {
            storage.delete(&record).await?;
        }
    }
    storage.delete(&key).await?;
    Ok(true)
}

pub struct Table<T: Record> {
    storage: Arc<dyn StorageBackend>,
    // Serialises id allocation and read-modify-write of the marker.
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Table<T> {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    async fn load_meta(&self) -> Result<TableMeta> {
        let key = meta_key(T::TABLE);
        if !self.storage.exists(&key).await? {
            return Err(Error::migration(format!(
                "table '{}' does not exist; run migrations",
                T::TABLE
            )));
        }
        let data = self.storage.get(&key).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_record(&self, record: &T) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        self.storage
            .put(&record_key(T::TABLE, record.id()), Bytes::from(data))
            .await
    }

    /// Allocate the next id and persist the record built from it.
    pub async fn insert<F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(RecordId) -> T,
    {
        let _guard = self.write_lock.lock().await;

        let mut meta = self.load_meta().await?;
        let record = build(meta.next_id);
        if record.id() != meta.next_id {
            return Err(Error::internal(format!(
                "{} built with id {} instead of allocated id {}",
                T::ENTITY,
                record.id(),
                meta.next_id
            )));
        }

        // Claim the id before writing the record; a failure afterwards only
        // leaves a gap, never a reused id.
        meta.next_id += 1;
        self.storage
            .put(
                &meta_key(T::TABLE),
                Bytes::from(serde_json::to_vec_pretty(&meta)?),
            )
            .await?;

        self.write_record(&record).await?;

        Ok(record)
    }

    pub async fn get(&self, id: RecordId) -> Result<T> {
        self.load_meta().await?;

        let key = record_key(T::TABLE, id);
        if !self.storage.exists(&key).await? {
            return Err(Error::not_found(T::ENTITY, id));
        }
        let data = self.storage.get(&key).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Records in ascending id order that satisfy `filter`, paginated.
    pub async fn scan<F>(&self, offset: usize, limit: usize, filter: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.load_meta().await?;

        let mut results = Vec::new();
        let mut skipped = 0;
        for key in self.record_keys().await? {
            if results.len() >= limit {
                break;
            }
            let record: T = match self.storage.get(&key).await {
                Ok(data) => serde_json::from_slice(&data)?,
                // Deleted between list and read.
                Err(Error::Storage(_)) => continue,
                Err(e) => return Err(e),
            };
            if !filter(&record) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            results.push(record);
        }
        Ok(results)
    }

    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<T>> {
        self.scan(offset, limit, |_| true).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.load_meta().await?;

        let key = record_key(T::TABLE, id);
        if !self.storage.exists(&key).await? {
            return Err(Error::not_found(T::ENTITY, id));
        }
        self.storage.delete(&key).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.load_meta().await?;
        Ok(self.record_keys().await?.len())
    }

    async fn record_keys(&self) -> Result<Vec<String>> {
        let marker = meta_key(T::TABLE);
        let mut keys: Vec<String> = self
            .storage
            .list(T::TABLE)
            .await?
            .into_iter()
            .filter(|key| key.ends_with(".json") && *key != marker)
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataLog, DataLogCreate, LogLevel};
    use crate::storage::memory::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory storage whose next write to a table marker fails once armed
    #[derive(Default)]
    struct FlakyMarkerStorage {
        inner: MemoryStorage,
        fail_next_marker_write: AtomicBool,
    }

    #[async_trait]
    impl StorageBackend for FlakyMarkerStorage {
        async fn get(&self, key: &str) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, data: Bytes) -> Result<()> {
            if key.ends_with(META_FILE) && self.fail_next_marker_write.swap(false, Ordering::SeqCst)
            {
                return Err(Error::storage("marker write failed"));
            }
            self.inner.put(key, data).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.list(prefix).await
        }
    }

    fn payload(message: &str) -> DataLogCreate {
        DataLogCreate {
            level: LogLevel::Info,
            message: message.to_string(),
            source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_requires_migrated_table() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let table: Table<DataLog> = Table::new(storage);

        let err = table.insert(|id| payload("x").into_log(id)).await.unwrap_err();
        assert!(matches!(err, Error::Migration(_)));
    }

    #[tokio::test]
    async fn ids_increase_and_survive_deletes() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        create_table(storage.as_ref(), "data_logs").await.unwrap();
        let table: Table<DataLog> = Table::new(storage);

        for i in 0..12 {
            table
                .insert(|id| payload(&format!("m{i}")).into_log(id))
                .await
                .unwrap();
        }
        table.delete(12).await.unwrap();
        let next = table.insert(|id| payload("after").into_log(id)).await.unwrap();
        assert_eq!(next.id, 13);

        let ids: Vec<_> = table.list(0, 100).await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13]);

        let page: Vec<_> = table.list(9, 2).await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(page, vec![10, 11]);
        assert_eq!(table.count().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn drop_table_removes_records() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        create_table(storage.as_ref(), "data_logs").await.unwrap();
        let table: Table<DataLog> = Table::new(storage.clone());
        table.insert(|id| payload("x").into_log(id)).await.unwrap();

        assert!(drop_table(storage.as_ref(), "data_logs").await.unwrap());
        assert!(storage.list("data_logs").await.unwrap().is_empty());
        assert!(!drop_table(storage.as_ref(), "data_logs").await.unwrap());
    }

    #[tokio::test]
    async fn failed_marker_write_never_reuses_an_id() {
        let flaky = Arc::new(FlakyMarkerStorage::default());
        create_table(flaky.as_ref(), "data_logs").await.unwrap();
        let table: Table<DataLog> = Table::new(flaky.clone());

        flaky.fail_next_marker_write.store(true, Ordering::SeqCst);
        let result = table.insert(|id| payload("lost").into_log(id)).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(table.list(0, 10).await.unwrap().is_empty());

        let kept = table.insert(|id| payload("kept").into_log(id)).await.unwrap();
        let after = table.insert(|id| payload("after").into_log(id)).await.unwrap();
        assert_ne!(kept.id, after.id);

        let messages: Vec<_> = table
            .list(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|log| (log.id, log.message))
            .collect();
        assert_eq!(
            messages,
            vec![(kept.id, "kept".to_string()), (after.id, "after".to_string())]
        );
    }
}
