//! In-memory stand-ins for [`crate::RelationalStore`] and
//! [`crate::ObjectStore`], used by scenario tests instead of a live Postgres
//! instance or filesystem.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use payflow_audit::AuditLogEntry;
use payflow_schemas::{Batch, Line};
use tokio::sync::RwLock;

use crate::{ObjectStore, RelationalStore};

#[derive(Default)]
pub struct InMemoryStore {
    batches: RwLock<HashMap<String, Batch>>,
    lines: RwLock<HashMap<String, Line>>,
    audit: RwLock<HashMap<String, Vec<AuditLogEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        self.batches.write().await.insert(batch.batch_id.clone(), batch.clone());
        Ok(())
    }

    async fn batch_exists(&self, batch_id: &str) -> Result<bool> {
        Ok(self.batches.read().await.contains_key(batch_id))
    }

    async fn upsert_line(&self, line: &Line) -> Result<()> {
        self.lines.write().await.insert(line.line_id.clone(), line.clone());
        Ok(())
    }

    async fn get_line(&self, line_id: &str) -> Result<Option<Line>> {
        Ok(self.lines.read().await.get(line_id).cloned())
    }

    async fn lines_for_batch(&self, batch_id: &str) -> Result<Vec<Line>> {
        Ok(self
            .lines
            .read()
            .await
            .values()
            .filter(|l| l.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn all_lines(&self) -> Result<Vec<Line>> {
        Ok(self.lines.read().await.values().cloned().collect())
    }

    async fn append_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut audit = self.audit.write().await;
        let entries = audit.entry(entry.event.batch_id.clone()).or_default();
        if !entries.iter().any(|e| e.event.seq == entry.event.seq) {
            entries.push(entry.clone());
        }
        Ok(())
    }

    async fn audit_entries_for_batch(&self, batch_id: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self.audit.read().await.get(batch_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), Arc::new(bytes));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(key).map(|b| b.as_ref().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payflow_schemas::{BatchSource};

    fn batch(id: &str) -> Batch {
        Batch {
            batch_id: id.to_string(),
            tenant_id: "tenant-1".to_string(),
            source: BatchSource::Frontend,
            upload_ts: Utc::now(),
            policy_version: "v1".to_string(),
            line_count: 0,
            schema_version: 1,
        }
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips() {
        let store = InMemoryStore::new();
        store.insert_batch(&batch("B1")).await.unwrap();
        assert!(store.lines_for_batch("B1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn object_store_round_trips_bytes() {
        let store = InMemoryObjectStore::new();
        store.put("k", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
