//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use biller_types::{
    Bill, BillRepository, CreateBillRequest, PaymentStatus, RepoError, SettleOutcome,
};

use crate::types::{DbBill, SQLITE_DATE_FORMAT, amount_to_db, map_insert_error};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens a fresh database, so in-memory
        // pools are pinned to a single long-lived connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_bills.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BillRepository for SqliteRepo {
    async fn find_latest_by_payer(&self, payer_reference: &str) -> Result<Option<Bill>, RepoError> {
        let row: Option<DbBill> = sqlx::query_as(
            r#"SELECT invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                      payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at
               FROM bills WHERE payer_reference = ?
               ORDER BY invoice_date DESC, invoice_id DESC
               LIMIT 1"#,
        )
        .bind(payer_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBill::into_domain).transpose()
    }

    async fn find_latest_outstanding_by_payer(
        &self,
        payer_reference: &str,
    ) -> Result<Option<Bill>, RepoError> {
        let row: Option<DbBill> = sqlx::query_as(
            r#"SELECT invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                      payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at
               FROM bills WHERE payer_reference = ? AND payment_status IS NULL
               ORDER BY invoice_date DESC, invoice_id DESC
               LIMIT 1"#,
        )
        .bind(payer_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBill::into_domain).transpose()
    }

    async fn get_bill(&self, invoice_id: &str) -> Result<Option<Bill>, RepoError> {
        let row: Option<DbBill> = sqlx::query_as(
            r#"SELECT invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                      payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at
               FROM bills WHERE invoice_id = ?"#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBill::into_domain).transpose()
    }

    async fn settle(
        &self,
        invoice_id: &str,
        channel: &str,
        journal_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Compare-and-set: only an outstanding row matches the WHERE clause.
        let updated: Option<DbBill> = sqlx::query_as(
            r#"UPDATE bills
               SET payment_status = ?, settled_at = ?, settlement_channel = ?, settlement_journal_ref = ?
               WHERE invoice_id = ? AND payment_status IS NULL
               RETURNING invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                         payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at"#,
        )
        .bind(PaymentStatus::Settled.to_string())
        .bind(now.to_rfc3339())
        .bind(channel)
        .bind(journal_ref)
        .bind(invoice_id)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let outcome = match updated {
            Some(row) => SettleOutcome::Settled(row.into_domain()?),
            None => {
                let existing: Option<String> =
                    sqlx::query_scalar(r#"SELECT invoice_id FROM bills WHERE invoice_id = ?"#)
                        .bind(invoice_id)
                        .fetch_optional(&mut *db_tx)
                        .await
                        .map_err(|e| RepoError::Database(e.to_string()))?;

                if existing.is_some() {
                    SettleOutcome::AlreadySettled
                } else {
                    SettleOutcome::NotFound
                }
            }
        };

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(outcome)
    }

    async fn create_bill(&self, req: CreateBillRequest) -> Result<Bill, RepoError> {
        // Validate first
        let bill = Bill::new(
            req.invoice_id,
            req.payer_reference,
            req.payer_name,
            req.invoice_date,
            req.amount_due,
            req.description,
        )
        .map_err(RepoError::Domain)?;

        sqlx::query(
            r#"INSERT INTO bills (invoice_id, payer_reference, payer_name, invoice_date, amount_due, description, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&bill.invoice_id)
        .bind(&bill.payer_reference)
        .bind(&bill.payer_name)
        .bind(bill.invoice_date.format(SQLITE_DATE_FORMAT).to_string())
        .bind(amount_to_db(bill.amount_due)?)
        .bind(&bill.description)
        .bind(bill.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &bill.invoice_id))?;

        Ok(bill)
    }
}
