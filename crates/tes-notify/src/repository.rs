//! Email outbox repository trait

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{EmailMessage, OutboxEmail};

/// Storage backend for the durable email queue. Producers only ever call
/// `enqueue`; the rest is the worker's lifecycle.
#[async_trait]
pub trait EmailOutboxRepository: Send + Sync {
    /// Append a message in PENDING state.
    async fn enqueue(&self, message: &EmailMessage) -> Result<OutboxEmail>;

    /// Oldest PENDING messages, up to `limit`.
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxEmail>>;

    /// Claim a batch before delivery so a second worker skips it.
    async fn mark_processing(&self, ids: &[i64]) -> Result<()>;

    async fn mark_sent(&self, id: i64) -> Result<()>;

    /// Record a delivery failure. The message goes back to PENDING for
    /// another attempt until `max_attempts` is reached, then parks as
    /// FAILED.
    async fn mark_failed(&self, id: i64, error: &str, max_attempts: i32) -> Result<u64>;

    /// Return PROCESSING rows older than `stuck_after` to PENDING. Covers
    /// workers that died mid-batch.
    async fn requeue_stuck(&self, stuck_after: Duration) -> Result<u64>;

    /// Prune delivered messages older than `cutoff`.
    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
