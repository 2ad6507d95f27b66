//! Persistence layer: a `RelationalStore` trait for batch/line/audit rows
//! and an `ObjectStore` trait for blob artifacts (raw invoices, CRRAK
//! reports), each with an in-memory test double alongside the production
//! implementation, grounded on the teacher's `mqk-db` pattern of keeping
//! every adapter behind a trait so paper/test substitutes can stand in for
//! the live one.

pub mod memory;
pub mod objects;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use payflow_audit::AuditLogEntry;
use payflow_schemas::{Batch, Line};

/// Durable storage for batches, lines, and their audit trail. One
/// implementation talks to Postgres (`PostgresStore`); another keeps
/// everything in a `HashMap` for unit and scenario tests (`InMemoryStore`).
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn insert_batch(&self, batch: &Batch) -> Result<()>;
    async fn batch_exists(&self, batch_id: &str) -> Result<bool>;
    async fn upsert_line(&self, line: &Line) -> Result<()>;
    async fn get_line(&self, line_id: &str) -> Result<Option<Line>>;
    async fn lines_for_batch(&self, batch_id: &str) -> Result<Vec<Line>>;
    async fn all_lines(&self) -> Result<Vec<Line>>;
    async fn append_audit_entry(&self, entry: &AuditLogEntry) -> Result<()>;
    async fn audit_entries_for_batch(&self, batch_id: &str) -> Result<Vec<AuditLogEntry>>;
}

/// Durable storage for blob artifacts, addressed by the deterministic keys
/// in `payflow_schemas::keys`. One implementation writes under a root
/// directory (`FsObjectStore`); another keeps everything in memory
/// (`InMemoryObjectStore`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

pub use memory::{InMemoryObjectStore, InMemoryStore};
pub use objects::FsObjectStore;
pub use postgres::{DbStatus, PostgresStore, ENV_DB_URL};
