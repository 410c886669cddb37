//! Event Entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How long before start_time the booking window closes.
pub const BOOKING_CUTOFF_HOURS: i64 = 1;

/// Default lead time for events created without an explicit start_time.
pub const DEFAULT_START_OFFSET_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,

    /// Unique across all events
    pub title: String,

    /// URL-safe, derived from the title at creation only and never
    /// recomputed on rename
    pub slug: String,

    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,

    /// Owning organizer/admin account id
    pub created_by: i64,

    /// Materialized ticket count, updated in the booking transaction
    pub participant_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        start_time: DateTime<Utc>,
        created_by: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            slug: slug.into(),
            description: description.into(),
            location: location.into(),
            start_time,
            created_by,
            participant_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Instant at which ticket purchase stops being accepted.
    pub fn booking_closes_at(&self) -> DateTime<Utc> {
        self.start_time - Duration::hours(BOOKING_CUTOFF_HOURS)
    }

    /// True while `at` is still inside the booking window.
    pub fn booking_open(&self, at: DateTime<Utc>) -> bool {
        at < self.booking_closes_at()
    }
}

/// Default start_time for events created without one.
pub fn default_start_time() -> DateTime<Utc> {
    Utc::now() + Duration::hours(DEFAULT_START_OFFSET_HOURS)
}
