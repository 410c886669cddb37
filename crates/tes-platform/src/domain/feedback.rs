//! Feedback Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Feedback left by a ticket holder. The ticket-possession gate lives at
/// the API boundary, not here; the rows themselves carry no uniqueness,
/// a user may leave several entries for one event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(user_id: i64, event_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            event_id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
