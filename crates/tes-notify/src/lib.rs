//! Durable email queue
//!
//! Notifications are enqueued into Postgres in the same deployment as the
//! API and drained by a separate worker, so a mail gateway outage never
//! shows up in request latency. Delivery is at-least-once: a message
//! stays PENDING until a worker claims it, retries on failure, and parks
//! as FAILED after too many attempts.

pub mod mailer;
pub mod postgres;
pub mod repository;

pub use mailer::{HttpMailer, LogMailer, Mailer};
pub use postgres::PostgresEmailOutbox;
pub use repository::EmailOutboxRepository;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info};

/// What producers hand to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "PENDING",
            EmailStatus::Processing => "PROCESSING",
            EmailStatus::Sent => "SENT",
            EmailStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(EmailStatus::Pending),
            "PROCESSING" => Some(EmailStatus::Processing),
            "SENT" => Some(EmailStatus::Sent),
            "FAILED" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

/// A queued email as stored.
#[derive(Debug, Clone)]
pub struct OutboxEmail {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const STUCK_AFTER: Duration = Duration::from_secs(300);

/// Polls the outbox and pushes messages through a [`Mailer`].
pub struct NotifyProcessor {
    repository: Arc<dyn EmailOutboxRepository>,
    mailer: Arc<dyn Mailer>,
    poll_interval: Duration,
    batch_size: i64,
    max_attempts: i32,
}

impl NotifyProcessor {
    pub fn new(repository: Arc<dyn EmailOutboxRepository>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            repository,
            mailer,
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            max_attempts: 5,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run until the shutdown channel fires.
    pub async fn start(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "notify processor started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(err) = self.repository.requeue_stuck(STUCK_AFTER).await {
                        error!(error = %err, "failed to requeue stuck emails");
                    }
                    match self.process_batch().await {
                        Ok(0) => {}
                        Ok(count) => info!(count, "delivered emails"),
                        Err(err) => error!(error = %err, "email batch failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("notify processor shutting down");
                    break;
                }
            }
        }
    }

    /// One polling cycle: claim a batch, attempt delivery, record the
    /// outcome per message. Returns how many were sent.
    pub async fn process_batch(&self) -> Result<usize> {
        let emails = self.repository.fetch_pending(self.batch_size).await?;
        if emails.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = emails.iter().map(|email| email.id).collect();
        self.repository.mark_processing(&ids).await?;

        let mut sent = 0;
        for email in &emails {
            let message = EmailMessage {
                to: email.recipient.clone(),
                subject: email.subject.clone(),
                body: email.body.clone(),
            };
            match self.mailer.send(&message).await {
                Ok(()) => {
                    self.repository.mark_sent(email.id).await?;
                    sent += 1;
                }
                Err(err) => {
                    error!(email_id = email.id, error = %err, "email delivery failed");
                    self.repository
                        .mark_failed(email.id, &err.to_string(), self.max_attempts)
                        .await?;
                }
            }
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct InMemoryOutbox {
        emails: Mutex<Vec<OutboxEmail>>,
    }

    impl InMemoryOutbox {
        fn new() -> Self {
            Self { emails: Mutex::new(Vec::new()) }
        }

        fn snapshot(&self) -> Vec<OutboxEmail> {
            self.emails.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailOutboxRepository for InMemoryOutbox {
        async fn enqueue(&self, message: &EmailMessage) -> Result<OutboxEmail> {
            let mut emails = self.emails.lock().unwrap();
            let email = OutboxEmail {
                id: emails.len() as i64 + 1,
                recipient: message.to.clone(),
                subject: message.subject.clone(),
                body: message.body.clone(),
                status: EmailStatus::Pending,
                attempts: 0,
                last_error: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            emails.push(email.clone());
            Ok(email)
        }

        async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxEmail>> {
            Ok(self
                .emails
                .lock()
                .unwrap()
                .iter()
                .filter(|email| email.status == EmailStatus::Pending)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn mark_processing(&self, ids: &[i64]) -> Result<()> {
            for email in self.emails.lock().unwrap().iter_mut() {
                if ids.contains(&email.id) {
                    email.status = EmailStatus::Processing;
                }
            }
            Ok(())
        }

        async fn mark_sent(&self, id: i64) -> Result<()> {
            for email in self.emails.lock().unwrap().iter_mut() {
                if email.id == id {
                    email.status = EmailStatus::Sent;
                    email.last_error = None;
                }
            }
            Ok(())
        }

        async fn mark_failed(&self, id: i64, error: &str, max_attempts: i32) -> Result<u64> {
            let mut updated = 0;
            for email in self.emails.lock().unwrap().iter_mut() {
                if email.id == id {
                    email.attempts += 1;
                    email.last_error = Some(error.to_string());
                    email.status = if email.attempts >= max_attempts {
                        EmailStatus::Failed
                    } else {
                        EmailStatus::Pending
                    };
                    updated += 1;
                }
            }
            Ok(updated)
        }

        async fn requeue_stuck(&self, _stuck_after: Duration) -> Result<u64> {
            Ok(0)
        }

        async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            let mut emails = self.emails.lock().unwrap();
            let before = emails.len();
            emails.retain(|email| {
                !(email.status == EmailStatus::Sent && email.updated_at < cutoff)
            });
            Ok((before - emails.len()) as u64)
        }
    }

    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: AtomicBool,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
        }

        fn failing() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: AtomicBool::new(true) }
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("gateway down");
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome".to_string(),
            body: "Hello".to_string(),
        }
    }

    #[tokio::test]
    async fn delivers_pending_emails() {
        let repository = Arc::new(InMemoryOutbox::new());
        let mailer = Arc::new(RecordingMailer::new());
        repository.enqueue(&message("a@example.com")).await.unwrap();
        repository.enqueue(&message("b@example.com")).await.unwrap();

        let processor = NotifyProcessor::new(repository.clone(), mailer.clone());
        let sent = processor.process_batch().await.unwrap();

        assert_eq!(sent, 2);
        assert_eq!(mailer.sent_count(), 2);
        assert!(repository.snapshot().iter().all(|email| email.status == EmailStatus::Sent));
    }

    #[tokio::test]
    async fn failed_delivery_retries_then_parks() {
        let repository = Arc::new(InMemoryOutbox::new());
        let mailer = Arc::new(RecordingMailer::failing());
        repository.enqueue(&message("a@example.com")).await.unwrap();

        let processor =
            NotifyProcessor::new(repository.clone(), mailer.clone()).with_max_attempts(2);

        processor.process_batch().await.unwrap();
        let email = &repository.snapshot()[0];
        assert_eq!(email.status, EmailStatus::Pending);
        assert_eq!(email.attempts, 1);
        assert_eq!(email.last_error.as_deref(), Some("gateway down"));

        processor.process_batch().await.unwrap();
        let email = &repository.snapshot()[0];
        assert_eq!(email.status, EmailStatus::Failed);
        assert_eq!(email.attempts, 2);

        // Parked messages are not picked up again.
        let sent = processor.process_batch().await.unwrap();
        assert_eq!(sent, 0);
        assert_eq!(repository.snapshot()[0].attempts, 2);
    }

    #[tokio::test]
    async fn respects_batch_size() {
        let repository = Arc::new(InMemoryOutbox::new());
        let mailer = Arc::new(RecordingMailer::new());
        repository.enqueue(&message("a@example.com")).await.unwrap();
        repository.enqueue(&message("b@example.com")).await.unwrap();

        let processor =
            NotifyProcessor::new(repository.clone(), mailer.clone()).with_batch_size(1);
        assert_eq!(processor.process_batch().await.unwrap(), 1);

        let snapshot = repository.snapshot();
        assert_eq!(
            snapshot.iter().filter(|email| email.status == EmailStatus::Sent).count(),
            1
        );
        assert_eq!(
            snapshot.iter().filter(|email| email.status == EmailStatus::Pending).count(),
            1
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in
            [EmailStatus::Pending, EmailStatus::Processing, EmailStatus::Sent, EmailStatus::Failed]
        {
            assert_eq!(EmailStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(EmailStatus::from_str("BOGUS"), None);
    }
}
