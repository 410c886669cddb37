//! Notification producer
//!
//! Composes the account and booking emails and hands them to the outbox.
//! Enqueue failures are logged and swallowed: mail is best-effort and
//! must never fail the request that triggered it.

use std::sync::Arc;

use tes_notify::{EmailMessage, EmailOutboxRepository};
use tracing::error;

use crate::domain::{Event, User};

pub struct NotifyService {
    outbox: Arc<dyn EmailOutboxRepository>,
    frontend_base: String,
}

impl NotifyService {
    pub fn new(outbox: Arc<dyn EmailOutboxRepository>, frontend_base: impl Into<String>) -> Self {
        let frontend_base = frontend_base.into();
        Self { frontend_base: frontend_base.trim_end_matches('/').to_string(), outbox }
    }

    pub async fn send_activation_email(&self, user: &User, uid: &str, token: &str) {
        let link = format!("{}/activate-account/{uid}/{token}", self.frontend_base);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Activate your Tessera account".to_string(),
            body: format!(
                "Hi {},\n\nWelcome to Tessera. Activate your account by opening the link below:\n\n{link}\n\nThe link expires after a day. If you did not register, ignore this email.\n",
                user.first_name
            ),
        };
        self.enqueue(message).await;
    }

    pub async fn send_password_reset_email(&self, user: &User, uid: &str, token: &str) {
        let link = format!("{}/password-reset-confirm/{uid}/{token}", self.frontend_base);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Reset your Tessera password".to_string(),
            body: format!(
                "Hi {},\n\nA password reset was requested for your account. Open the link below to choose a new password:\n\n{link}\n\nIf you did not request this, ignore this email and your password stays unchanged.\n",
                user.first_name
            ),
        };
        self.enqueue(message).await;
    }

    pub async fn send_booking_confirmation(&self, user: &User, event: &Event) {
        let message = EmailMessage {
            to: user.email.clone(),
            subject: format!("Ticket confirmed: {}", event.title),
            body: format!(
                "Hi {},\n\nYour ticket for \"{}\" is booked.\n\nWhen: {}\nWhere: {}\n\nSee you there!\n",
                user.first_name,
                event.title,
                event.start_time.format("%Y-%m-%d %H:%M UTC"),
                event.location,
            ),
        };
        self.enqueue(message).await;
    }

    async fn enqueue(&self, message: EmailMessage) {
        if let Err(err) = self.outbox.enqueue(&message).await {
            error!(to = %message.to, subject = %message.subject, error = %err, "failed to enqueue email");
        }
    }
}
