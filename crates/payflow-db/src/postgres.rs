//! Postgres-backed [`crate::RelationalStore`], grounded on `mqk-db`'s style
//! of free-standing `sqlx::query`/`query_as` calls against a `PgPool`
//! (connectivity via `connect_from_env`, no compile-time-checked `query!`
//! macro so the crate builds without a live database).

use anyhow::{Context, Result};
use async_trait::async_trait;
use payflow_audit::AuditLogEntry;
use payflow_schemas::{Batch, BatchSource, Line, LineStatus, PaymentType};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::RelationalStore;

pub const ENV_DB_URL: &str = "PAYFLOW_DATABASE_URL";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect_from_env() -> Result<Self> {
        let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("db migrate failed")?;
        Ok(())
    }

    /// Connectivity + schema-presence check for `payflow-cli db status`.
    pub async fn status(&self) -> Result<DbStatus> {
        let (one,): (i32,) = sqlx::query_as("select 1").fetch_one(&self.pool).await.context("connectivity query failed")?;

        let (exists,): (bool,) = sqlx::query_as(
            r#"
            select exists (
                select 1 from information_schema.tables
                where table_schema = 'public' and table_name = 'batches'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("table-exists query failed")?;

        Ok(DbStatus { ok: one == 1, has_batches_table: exists })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DbStatus {
    pub ok: bool,
    pub has_batches_table: bool,
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        sqlx::query(
            r#"
            insert into batches (batch_id, tenant_id, source, upload_ts, policy_version, line_count, schema_version)
            values ($1, $2, $3, $4, $5, $6, $7)
            on conflict (batch_id) do nothing
            "#,
        )
        .bind(&batch.batch_id)
        .bind(&batch.tenant_id)
        .bind(match batch.source {
            BatchSource::Frontend => "FRONTEND",
            BatchSource::BankApi => "BANK_API",
        })
        .bind(batch.upload_ts)
        .bind(&batch.policy_version)
        .bind(batch.line_count as i32)
        .bind(batch.schema_version as i32)
        .execute(&self.pool)
        .await
        .context("insert_batch failed")?;
        Ok(())
    }

    async fn batch_exists(&self, batch_id: &str) -> Result<bool> {
        let row = sqlx::query("select exists(select 1 from batches where batch_id = $1) as exists_")
            .bind(batch_id)
            .fetch_one(&self.pool)
            .await
            .context("batch_exists failed")?;
        row.try_get("exists_").context("exists_ column")
    }

    async fn upsert_line(&self, line: &Line) -> Result<()> {
        sqlx::query(
            r#"
            insert into lines (line_id, batch_id, transaction_id, payment_type, amount_paise, currency,
                                purpose_code, sender, receiver, schedule_ts, additional_fields, status)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            on conflict (line_id) do update set
                status = excluded.status,
                additional_fields = excluded.additional_fields
            "#,
        )
        .bind(&line.line_id)
        .bind(&line.batch_id)
        .bind(&line.transaction_id)
        .bind(format!("{:?}", line.payment_type))
        .bind(line.amount.0)
        .bind(&line.currency)
        .bind(&line.purpose_code)
        .bind(serde_json::to_value(&line.sender).context("serialize sender")?)
        .bind(serde_json::to_value(&line.receiver).context("serialize receiver")?)
        .bind(line.schedule_ts)
        .bind(serde_json::to_value(&line.additional_fields).context("serialize additional_fields")?)
        .bind(line_status_str(line.status))
        .execute(&self.pool)
        .await
        .context("upsert_line failed")?;
        Ok(())
    }

    async fn get_line(&self, line_id: &str) -> Result<Option<Line>> {
        let row = sqlx::query(
            r#"
            select line_id, batch_id, transaction_id, payment_type, amount_paise, currency,
                   purpose_code, sender, receiver, schedule_ts, additional_fields, status
            from lines where line_id = $1
            "#,
        )
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await
        .context("get_line failed")?;

        row.map(row_to_line).transpose()
    }

    async fn lines_for_batch(&self, batch_id: &str) -> Result<Vec<Line>> {
        let rows = sqlx::query(
            r#"
            select line_id, batch_id, transaction_id, payment_type, amount_paise, currency,
                   purpose_code, sender, receiver, schedule_ts, additional_fields, status
            from lines where batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .context("lines_for_batch failed")?;

        rows.into_iter().map(row_to_line).collect()
    }

    async fn all_lines(&self) -> Result<Vec<Line>> {
        let rows = sqlx::query(
            r#"
            select line_id, batch_id, transaction_id, payment_type, amount_paise, currency,
                   purpose_code, sender, receiver, schedule_ts, additional_fields, status
            from lines
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("all_lines failed")?;

        rows.into_iter().map(row_to_line).collect()
    }

    async fn append_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            insert into audit_events (batch_id, seq, line_id, actor, action, detail_blob, ts, hash_prev, hash_self)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (batch_id, seq) do nothing
            "#,
        )
        .bind(&entry.event.batch_id)
        .bind(entry.event.seq as i64)
        .bind(&entry.event.line_id)
        .bind(format!("{:?}", entry.event.actor))
        .bind(&entry.event.action)
        .bind(&entry.event.detail_blob)
        .bind(entry.event.ts)
        .bind(&entry.hash_prev)
        .bind(&entry.hash_self)
        .execute(&self.pool)
        .await
        .context("append_audit_entry failed")?;
        Ok(())
    }

    async fn audit_entries_for_batch(&self, batch_id: &str) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            select batch_id, seq, line_id, actor, action, detail_blob, ts, hash_prev, hash_self
            from audit_events where batch_id = $1 order by seq asc
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .context("audit_entries_for_batch failed")?;

        rows.into_iter().map(row_to_audit_entry).collect()
    }
}

fn line_status_str(status: LineStatus) -> &'static str {
    match status {
        LineStatus::Pending => "PENDING",
        LineStatus::Processing => "PROCESSING",
        LineStatus::Completed => "COMPLETED",
        LineStatus::Failed => "FAILED",
        LineStatus::Hold => "HOLD",
    }
}

fn line_status_from_str(s: &str) -> LineStatus {
    match s {
        "PROCESSING" => LineStatus::Processing,
        "COMPLETED" => LineStatus::Completed,
        "FAILED" => LineStatus::Failed,
        "HOLD" => LineStatus::Hold,
        _ => LineStatus::Pending,
    }
}

fn payment_type_from_debug(s: &str) -> PaymentType {
    match s {
        "Payroll" => PaymentType::Payroll,
        "VendorPayment" => PaymentType::VendorPayment,
        "LoanDisbursement" => PaymentType::LoanDisbursement,
        "Utility" => PaymentType::Utility,
        "Tax" => PaymentType::Tax,
        "Refund" => PaymentType::Refund,
        "Transfer" => PaymentType::Transfer,
        _ => PaymentType::Unknown,
    }
}

fn row_to_line(row: sqlx::postgres::PgRow) -> Result<Line> {
    let amount_paise: i64 = row.try_get("amount_paise").context("amount_paise column")?;
    let status: String = row.try_get("status").context("status column")?;
    let payment_type: String = row.try_get("payment_type").context("payment_type column")?;
    let sender: serde_json::Value = row.try_get("sender").context("sender column")?;
    let receiver: serde_json::Value = row.try_get("receiver").context("receiver column")?;
    let additional_fields: serde_json::Value =
        row.try_get("additional_fields").context("additional_fields column")?;

    Ok(Line {
        line_id: row.try_get("line_id").context("line_id column")?,
        batch_id: row.try_get("batch_id").context("batch_id column")?,
        transaction_id: row.try_get("transaction_id").context("transaction_id column")?,
        payment_type: payment_type_from_debug(&payment_type),
        amount: payflow_schemas::money::Paise(amount_paise),
        currency: row.try_get("currency").context("currency column")?,
        purpose_code: row.try_get("purpose_code").context("purpose_code column")?,
        sender: serde_json::from_value(sender).context("deserialize sender")?,
        receiver: serde_json::from_value(receiver).context("deserialize receiver")?,
        schedule_ts: row.try_get("schedule_ts").context("schedule_ts column")?,
        additional_fields: serde_json::from_value(additional_fields).context("deserialize additional_fields")?,
        status: line_status_from_str(&status),
    })
}

fn row_to_audit_entry(row: sqlx::postgres::PgRow) -> Result<AuditLogEntry> {
    let actor: String = row.try_get("actor").context("actor column")?;
    Ok(AuditLogEntry {
        event: payflow_schemas::AuditEvent {
            seq: row.try_get::<i64, _>("seq").context("seq column")? as u64,
            batch_id: row.try_get("batch_id").context("batch_id column")?,
            line_id: row.try_get("line_id").context("line_id column")?,
            action: row.try_get("action").context("action column")?,
            actor: actor_from_debug(&actor),
            detail_blob: row.try_get("detail_blob").context("detail_blob column")?,
            ts: row.try_get("ts").context("ts column")?,
        },
        hash_prev: row.try_get("hash_prev").context("hash_prev column")?,
        hash_self: row.try_get("hash_self").context("hash_self column")?,
    })
}

fn actor_from_debug(s: &str) -> payflow_schemas::Actor {
    use payflow_schemas::Actor;
    match s {
        "Acc" => Actor::Acc,
        "Pdr" => Actor::Pdr,
        "Arl" => Actor::Arl,
        "Rca" => Actor::Rca,
        "Crrak" => Actor::Crrak,
        "Bank" => Actor::Bank,
        _ => Actor::Mcp,
    }
}
