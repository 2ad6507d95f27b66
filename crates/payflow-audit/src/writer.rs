use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use payflow_schemas::{Actor, AuditEvent};

/// One row on disk/in-memory, wrapping the shared [`AuditEvent`] shape with
/// the hash-chain links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(flatten)]
    pub event: AuditEvent,
    pub hash_prev: Option<String>,
    pub hash_self: String,
}

/// Single-producer, append-only log for one batch. Not `Clone`; callers
/// reach it through [`BatchAuditRegistry`], which enforces the "one writer
/// per batch at a time" discipline with an async mutex.
pub struct AuditLog {
    batch_id: String,
    entries: Vec<AuditLogEntry>,
    last_hash: Option<String>,
}

impl AuditLog {
    fn new(batch_id: String) -> Self {
        Self {
            batch_id,
            entries: Vec::new(),
            last_hash: None,
        }
    }

    /// Append one event. `seq` is assigned here — the only place a
    /// `(batch_id, seq)` pair is minted — so the gap-free invariant holds by
    /// construction as long as every append goes through this method.
    pub fn append(
        &mut self,
        line_id: Option<String>,
        actor: Actor,
        action: &str,
        detail_blob: Value,
    ) -> AuditLogEntry {
        let seq = self.entries.len() as u64 + 1;
        let event = AuditEvent {
            seq,
            batch_id: self.batch_id.clone(),
            line_id,
            action: action.to_string(),
            actor,
            detail_blob,
            ts: Utc::now(),
        };

        let hash_prev = self.last_hash.clone();
        let hash_self = compute_hash(&event, hash_prev.as_deref());

        let entry = AuditLogEntry {
            event,
            hash_prev,
            hash_self: hash_self.clone(),
        };
        self.last_hash = Some(hash_self);
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }
}

fn compute_hash(event: &AuditEvent, hash_prev: Option<&str>) -> String {
    let canonical = canonical_json(event);
    let mut hasher = Sha256::new();
    if let Some(prev) = hash_prev {
        hasher.update(prev.as_bytes());
    }
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn canonical_json<T: Serialize>(v: &T) -> String {
    let raw = serde_json::to_value(v).expect("audit event must serialize");
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).expect("canonical json must stringify")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Result of hash-chain verification over a batch's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { entries: usize },
    Broken { seq: u64, reason: String },
}

/// Verify both the `seq` gap-free invariant and the hash chain.
pub fn verify_hash_chain(entries: &[AuditLogEntry]) -> VerifyResult {
    let mut prev_hash: Option<String> = None;
    for (i, entry) in entries.iter().enumerate() {
        let expected_seq = i as u64 + 1;
        if entry.event.seq != expected_seq {
            return VerifyResult::Broken {
                seq: entry.event.seq,
                reason: format!("expected seq {expected_seq}, found {}", entry.event.seq),
            };
        }
        if entry.hash_prev != prev_hash {
            return VerifyResult::Broken {
                seq: entry.event.seq,
                reason: "hash_prev does not match previous entry's hash_self".to_string(),
            };
        }
        let recomputed = compute_hash(&entry.event, entry.hash_prev.as_deref());
        if recomputed != entry.hash_self {
            return VerifyResult::Broken {
                seq: entry.event.seq,
                reason: "hash_self does not match recomputed hash".to_string(),
            };
        }
        prev_hash = Some(entry.hash_self.clone());
    }
    VerifyResult::Valid {
        entries: entries.len(),
    }
}

/// Holds one [`AuditLog`] per `batch_id` behind a `tokio::sync::Mutex`,
/// giving the orchestrator the single-writer-per-batch guarantee required by
/// §5 without every caller having to manage locking directly.
#[derive(Clone, Default)]
pub struct BatchAuditRegistry {
    logs: Arc<Mutex<HashMap<String, Arc<Mutex<AuditLog>>>>>,
}

impl BatchAuditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (creating if absent) the mutex-guarded log for a batch.
    pub async fn log_for(&self, batch_id: &str) -> Arc<Mutex<AuditLog>> {
        let mut logs = self.logs.lock().await;
        logs.entry(batch_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AuditLog::new(batch_id.to_string()))))
            .clone()
    }

    pub async fn append(
        &self,
        batch_id: &str,
        line_id: Option<String>,
        actor: Actor,
        action: &str,
        detail_blob: Value,
    ) -> Result<AuditLogEntry> {
        let log = self.log_for(batch_id).await;
        let mut log = log.lock().await;
        Ok(log.append(line_id, actor, action, detail_blob))
    }

    pub async fn entries_for(&self, batch_id: &str) -> Vec<AuditLogEntry> {
        let log = self.log_for(batch_id).await;
        let log = log.lock().await;
        log.entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn seq_is_gap_free_and_chain_verifies() {
        let reg = BatchAuditRegistry::new();
        for i in 0..5 {
            reg.append(
                "batch-1",
                None,
                Actor::Mcp,
                "invoice_received",
                json!({ "i": i }),
            )
            .await
            .unwrap();
        }

        let entries = reg.entries_for("batch-1").await;
        let seqs: Vec<u64> = entries.iter().map(|e| e.event.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(verify_hash_chain(&entries), VerifyResult::Valid { entries: 5 });
    }

    #[tokio::test]
    async fn tampered_entry_breaks_the_chain() {
        let reg = BatchAuditRegistry::new();
        reg.append("batch-2", None, Actor::Mcp, "a", json!({})).await.unwrap();
        reg.append("batch-2", None, Actor::Acc, "b", json!({})).await.unwrap();

        let mut entries = reg.entries_for("batch-2").await;
        entries[0].event.action = "tampered".to_string();

        match verify_hash_chain(&entries) {
            VerifyResult::Broken { seq, .. } => assert_eq!(seq, 1),
            VerifyResult::Valid { .. } => panic!("expected tamper to break chain"),
        }
    }

    #[tokio::test]
    async fn separate_batches_each_start_seq_at_one() {
        let reg = BatchAuditRegistry::new();
        reg.append("batch-a", None, Actor::Mcp, "x", json!({})).await.unwrap();
        reg.append("batch-b", None, Actor::Mcp, "x", json!({})).await.unwrap();

        let a = reg.entries_for("batch-a").await;
        let b = reg.entries_for("batch-b").await;
        assert_eq!(a[0].event.seq, 1);
        assert_eq!(b[0].event.seq, 1);
    }
}
