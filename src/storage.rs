use crate::app::ports::BlobStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory blob store for development/testing
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
    puts: Arc<Mutex<usize>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let blobs = self.blobs.lock().unwrap();
        blobs.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Stored keys in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let blobs = self.blobs.lock().unwrap();
        let mut keys: Vec<String> = blobs
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of `put` calls, including overwrites
    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        debug!(bucket, key, size = bytes.len(), "Stored blob in memory");
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert((bucket.to_string(), key.to_string()), bytes);
        *self.puts.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryBlobStore::new();
        store.put("b", "k", vec![1]).await.unwrap();
        store.put("b", "k", vec![2]).await.unwrap();
        assert_eq!(store.keys("b"), vec!["k".to_string()]);
        assert_eq!(store.get("b", "k"), Some(vec![2]));
        assert_eq!(store.put_count(), 2);
    }
}
