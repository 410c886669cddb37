//! Postgres email outbox

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::repository::EmailOutboxRepository;
use crate::{EmailMessage, EmailStatus, OutboxEmail};

pub struct PostgresEmailOutbox {
    pool: PgPool,
}

impl PostgresEmailOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the outbox table if it does not exist. Safe to run on every
    /// startup.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS email_outbox (
                id BIGSERIAL PRIMARY KEY,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                attempts INT NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_email_outbox_status_created ON email_outbox (status, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn map_row(row: &sqlx::postgres::PgRow) -> Result<OutboxEmail> {
        let status: String = row.try_get("status")?;
        Ok(OutboxEmail {
            id: row.try_get("id")?,
            recipient: row.try_get("recipient")?,
            subject: row.try_get("subject")?,
            body: row.try_get("body")?,
            status: EmailStatus::from_str(&status)
                .ok_or_else(|| anyhow::anyhow!("unknown email status: {status}"))?,
            attempts: row.try_get("attempts")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl EmailOutboxRepository for PostgresEmailOutbox {
    async fn enqueue(&self, message: &EmailMessage) -> Result<OutboxEmail> {
        let row = sqlx::query(
            r#"
            INSERT INTO email_outbox (recipient, subject, body, status)
            VALUES ($1, $2, $3, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(&message.to)
        .bind(&message.subject)
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await?;
        Self::map_row(&row)
    }

    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxEmail>> {
        let rows = sqlx::query(
            "SELECT * FROM email_outbox WHERE status = 'PENDING' ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::map_row).collect()
    }

    async fn mark_processing(&self, ids: &[i64]) -> Result<()> {
        sqlx::query(
            "UPDATE email_outbox SET status = 'PROCESSING', updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_sent(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE email_outbox SET status = 'SENT', last_error = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str, max_attempts: i32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE email_outbox
            SET attempts = attempts + 1,
                last_error = $2,
                status = CASE WHEN attempts + 1 >= $3 THEN 'FAILED' ELSE 'PENDING' END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn requeue_stuck(&self, stuck_after: Duration) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(stuck_after)?;
        let result = sqlx::query(
            "UPDATE email_outbox SET status = 'PENDING', updated_at = NOW() WHERE status = 'PROCESSING' AND updated_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM email_outbox WHERE status = 'SENT' AND updated_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
