//! In-process collaborators for tests and local runs.

use super::{Embedder, Embedding, StoreRecord, VectorStore};
use crate::Result;
use crate::identity::sha256_hex;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Vector store backed by an in-memory map.
///
/// Clones share the same records. Iteration order is by record id, so
/// scrolls and snapshots are deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorStore {
    records: Arc<RwLock<BTreeMap<String, StoreRecord>>>,
}

impl MemoryVectorStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. from a snapshot on disk.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = StoreRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Record by id.
    pub async fn get(&self, record_id: &str) -> Option<StoreRecord> {
        self.records.read().await.get(record_id).cloned()
    }

    /// All records, ordered by id.
    pub async fn snapshot(&self) -> Vec<StoreRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

fn payload_matches(record: &StoreRecord, key: &str, value: &str) -> bool {
    record
        .payload
        .get(key)
        .and_then(serde_json::Value::as_str)
        .is_some_and(|v| v == value)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(
        &self,
        record_id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let record = StoreRecord {
            id: record_id.to_string(),
            vector,
            payload,
        };
        self.records
            .write()
            .await
            .insert(record_id.to_string(), record);
        debug!(record_id, "Upserted record");
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> Result<()> {
        self.records.write().await.remove(record_id);
        debug!(record_id, "Deleted record");
        Ok(())
    }

    async fn delete_by_filter(&self, key: &str, value: &str) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !payload_matches(record, key, value));
        Ok(before - records.len())
    }

    async fn scroll_by_filter(&self, key: &str, value: &str) -> Result<Vec<StoreRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| payload_matches(record, key, value))
            .cloned()
            .collect())
    }
}

/// Deterministic pseudo-embedding: unit vector expanded from sha256 of the
/// text. Equal texts embed equally; nothing semantic about it.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Embedder producing vectors of length `dimensions`.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// The unit vector for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        let mut block = 0u32;
        while vector.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(block.to_le_bytes());
            hasher.update(text.as_bytes());
            vector.extend(
                hasher
                    .finalize()
                    .iter()
                    .take(self.dimensions - vector.len())
                    .map(|b| f32::from(*b) / 127.5 - 1.0),
            );
            block += 1;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(Embedding {
            vector: self.vector_for(text),
            dimensions: self.dimensions,
            content_hash: Some(sha256_hex(text)),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_filters_by_payload() {
        let store = MemoryVectorStore::new();
        store
            .upsert("r1", vec![1.0], json!({"originalId": "a"}))
            .await
            .unwrap();
        store
            .upsert("r2", vec![1.0], json!({"originalId": "b"}))
            .await
            .unwrap();
        store
            .upsert("r1", vec![2.0], json!({"originalId": "a"}))
            .await
            .unwrap();

        let scrolled = store.scroll_by_filter("originalId", "a").await.unwrap();
        assert_eq!(scrolled.len(), 1);
        assert_eq!(scrolled[0].vector, vec![2.0]);

        assert_eq!(store.delete_by_filter("originalId", "b").await.unwrap(), 1);
        store.delete("missing").await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryVectorStore::from_records(vec![StoreRecord {
            id: "seed".to_string(),
            vector: vec![],
            payload: json!({}),
        }]);
        let clone = store.clone();

        clone.delete("seed").await.unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic_unit_vector() {
        let embedder = HashEmbedder::new(40);

        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("hello").await.unwrap();
        let c = embedder.embed("world").await.unwrap();

        assert_eq!(a.vector.len(), 40);
        assert_eq!(a.dimensions, 40);
        assert_eq!(a, b);
        assert_ne!(a.vector, c.vector);
        let norm: f32 = a.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(HashEmbedder::new(0).vector_for("x").is_empty());
    }
}
