//! Ticket Entity
//!
//! Join record between a user and an event. Created once by the booking
//! transaction, never updated or deleted in normal flow; the
//! (user_id, event_id) unique constraint is what makes booking idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::event::Event;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub purchase_time: DateTime<Utc>,
}

/// Ticket joined with its event, as listed under `/my-tickets/`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithEvent {
    pub ticket_id: i64,
    pub purchase_time: DateTime<Utc>,
    #[sqlx(flatten)]
    pub event: Event,
}
