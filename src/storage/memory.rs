//! In-process storage backend, used for tests and throwaway environments

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::{Error, Result};

use super::StorageBackend;

#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, Bytes>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::storage(format!("key '{}' does not exist", key)))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| {
                entry
                    .key()
                    .strip_prefix(&dir)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_only_returns_direct_children() {
        let storage = MemoryStorage::new();
        storage.put("users/1.json", Bytes::from("a")).await.unwrap();
        storage.put("users/2.json", Bytes::from("b")).await.unwrap();
        storage.put("users/nested/3.json", Bytes::from("c")).await.unwrap();
        storage.put("usersx/4.json", Bytes::from("d")).await.unwrap();

        let keys = storage.list("users").await.unwrap();
        assert_eq!(keys, vec!["users/1.json", "users/2.json"]);
    }
}
