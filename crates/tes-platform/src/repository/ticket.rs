//! Ticket Repository
//!
//! Booking runs inside a transaction so the ticket row and the event's
//! participant counter always move together. Double bookings are absorbed
//! by the (user_id, event_id) unique constraint rather than a racy
//! check-then-insert.

use chrono::Utc;
use sqlx::PgPool;

use crate::domain::{Ticket, TicketWithEvent};
use crate::error::Result;

/// Result of a booking attempt.
#[derive(Debug)]
pub enum BookOutcome {
    Created(Ticket),
    AlreadyBooked,
}

pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Book a ticket for `user_id` on `event_id`, incrementing the event's
    /// participant count in the same transaction. A conflicting booking
    /// leaves both tables untouched.
    pub async fn book(&self, user_id: i64, event_id: i64) -> Result<BookOutcome> {
        let mut tx = self.pool.begin().await?;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (user_id, event_id, purchase_time)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        match ticket {
            Some(ticket) => {
                sqlx::query(
                    "UPDATE events SET participant_count = participant_count + 1, updated_at = $2 WHERE id = $1",
                )
                .bind(event_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok(BookOutcome::Created(ticket))
            }
            None => {
                tx.rollback().await?;
                Ok(BookOutcome::AlreadyBooked)
            }
        }
    }

    pub async fn exists(&self, user_id: i64, event_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<TicketWithEvent>> {
        let tickets = sqlx::query_as::<_, TicketWithEvent>(
            r#"
            SELECT t.id AS ticket_id, t.purchase_time, e.*
            FROM tickets t
            JOIN events e ON e.id = t.event_id
            WHERE t.user_id = $1
            ORDER BY t.purchase_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }
}
