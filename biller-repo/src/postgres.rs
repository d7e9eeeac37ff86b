//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use biller_types::{
    Bill, BillRepository, CreateBillRequest, PaymentStatus, RepoError, SettleOutcome,
};

use crate::types::{DbBill, amount_to_db, map_insert_error};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with conditional (compare-and-set) settlement.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_bills_pg.sql"),
        "0001",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        tracing::info!("PostgreSQL migrations applied");
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BillRepository for PostgresRepo {
    async fn find_latest_by_payer(&self, payer_reference: &str) -> Result<Option<Bill>, RepoError> {
        let row: Option<DbBill> = sqlx::query_as(
            r#"SELECT invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                      payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at
               FROM bills WHERE payer_reference = $1
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
               FROM bills WHERE payer_reference = $1 AND payment_status IS NULL
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
               FROM bills WHERE invoice_id = $1"#,
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

        // The row lock taken by UPDATE serialises concurrent attempts; the
        // loser re-evaluates the WHERE clause after the winner commits.
        let updated: Option<DbBill> = sqlx::query_as(
            r#"UPDATE bills
               SET payment_status = $1, settled_at = $2, settlement_channel = $3, settlement_journal_ref = $4
               WHERE invoice_id = $5 AND payment_status IS NULL
               RETURNING invoice_id, payer_reference, payer_name, invoice_date, amount_due, description,
                         payment_status, settled_at, settlement_channel, settlement_journal_ref, created_at"#,
        )
        .bind(PaymentStatus::Settled.to_string())
        .bind(now)
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
                    sqlx::query_scalar(r#"SELECT invoice_id FROM bills WHERE invoice_id = $1"#)
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
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&bill.invoice_id)
        .bind(&bill.payer_reference)
        .bind(&bill.payer_name)
        .bind(bill.invoice_date)
        .bind(amount_to_db(bill.amount_due)?)
        .bind(&bill.description)
        .bind(bill.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &bill.invoice_id))?;

        Ok(bill)
    }
}
