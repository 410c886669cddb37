//! Event Repository
//!
//! Catalog queries. Listing supports the full filter/search/order surface
//! through one static statement with nullable binds; the ORDER BY column
//! comes from a closed enum, never from client input.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::Event;
use crate::error::Result;

/// Server-side listing filters. Every field is optional; `None` disables
/// the corresponding predicate.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub start_time_gt: Option<DateTime<Utc>>,
    pub start_time_gte: Option<DateTime<Utc>>,
    pub start_time_lt: Option<DateTime<Utc>>,
    pub start_time_lte: Option<DateTime<Utc>>,
    pub start_time_date: Option<NaiveDate>,
    pub created_at_gt: Option<DateTime<Utc>>,
    pub created_at_gte: Option<DateTime<Utc>>,
    pub created_at_lt: Option<DateTime<Utc>>,
    pub created_at_lte: Option<DateTime<Utc>>,
    pub created_at_date: Option<NaiveDate>,
    pub updated_at_gt: Option<DateTime<Utc>>,
    pub updated_at_gte: Option<DateTime<Utc>>,
    pub updated_at_lt: Option<DateTime<Utc>>,
    pub updated_at_lte: Option<DateTime<Utc>>,
    pub updated_at_date: Option<NaiveDate>,
    /// Case-insensitive substring match over the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    UpdatedAt,
    Id,
    StartTime,
}

/// Listing order. Parsed from the `ordering` query parameter, where a
/// leading `-` selects descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrder {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for EventOrder {
    fn default() -> Self {
        Self { field: OrderField::CreatedAt, descending: true }
    }
}

impl EventOrder {
    pub fn parse(param: &str) -> Option<Self> {
        let (name, descending) = match param.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (param, false),
        };
        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "updated_at" => OrderField::UpdatedAt,
            "id" => OrderField::Id,
            "start_time" => OrderField::StartTime,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    fn to_sql(self) -> &'static str {
        match (self.field, self.descending) {
            (OrderField::CreatedAt, false) => "created_at ASC",
            (OrderField::CreatedAt, true) => "created_at DESC",
            (OrderField::UpdatedAt, false) => "updated_at ASC",
            (OrderField::UpdatedAt, true) => "updated_at DESC",
            (OrderField::Id, false) => "id ASC",
            (OrderField::Id, true) => "id DESC",
            (OrderField::StartTime, false) => "start_time ASC",
            (OrderField::StartTime, true) => "start_time DESC",
        }
    }
}

const FILTER_SQL: &str = r#"
    WHERE ($1::timestamptz IS NULL OR start_time > $1)
      AND ($2::timestamptz IS NULL OR start_time >= $2)
      AND ($3::timestamptz IS NULL OR start_time < $3)
      AND ($4::timestamptz IS NULL OR start_time <= $4)
      AND ($5::date IS NULL OR start_time::date = $5)
      AND ($6::timestamptz IS NULL OR created_at > $6)
      AND ($7::timestamptz IS NULL OR created_at >= $7)
      AND ($8::timestamptz IS NULL OR created_at < $8)
      AND ($9::timestamptz IS NULL OR created_at <= $9)
      AND ($10::date IS NULL OR created_at::date = $10)
      AND ($11::timestamptz IS NULL OR updated_at > $11)
      AND ($12::timestamptz IS NULL OR updated_at >= $12)
      AND ($13::timestamptz IS NULL OR updated_at < $13)
      AND ($14::timestamptz IS NULL OR updated_at <= $14)
      AND ($15::date IS NULL OR updated_at::date = $15)
      AND ($16::text IS NULL OR title ILIKE '%' || $16 || '%')
"#;

pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &Event) -> Result<Event> {
        let row = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (title, slug, description, location, start_time, created_by, participant_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&event.title)
        .bind(&event.slug)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.created_by)
        .bind(event.participant_count)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    pub async fn title_exists(&self, title: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE title = $1)")
                .bind(title)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn title_exists_excluding(&self, title: &str, event_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE title = $1 AND id <> $2)")
                .bind(title)
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Full replace of the mutable fields. The slug is deliberately left
    /// untouched: it is fixed at creation.
    pub async fn update(&self, event: &Event) -> Result<Event> {
        let row = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, start_time = $5, updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT * FROM events {} ORDER BY {} LIMIT $17 OFFSET $18",
            FILTER_SQL,
            order.to_sql()
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(filter.start_time_gt)
            .bind(filter.start_time_gte)
            .bind(filter.start_time_lt)
            .bind(filter.start_time_lte)
            .bind(filter.start_time_date)
            .bind(filter.created_at_gt)
            .bind(filter.created_at_gte)
            .bind(filter.created_at_lt)
            .bind(filter.created_at_lte)
            .bind(filter.created_at_date)
            .bind(filter.updated_at_gt)
            .bind(filter.updated_at_gte)
            .bind(filter.updated_at_lt)
            .bind(filter.updated_at_lte)
            .bind(filter.updated_at_date)
            .bind(filter.search.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    pub async fn count(&self, filter: &EventFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM events {}", FILTER_SQL);
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(filter.start_time_gt)
            .bind(filter.start_time_gte)
            .bind(filter.start_time_lt)
            .bind(filter.start_time_lte)
            .bind(filter.start_time_date)
            .bind(filter.created_at_gt)
            .bind(filter.created_at_gte)
            .bind(filter.created_at_lt)
            .bind(filter.created_at_lte)
            .bind(filter.created_at_date)
            .bind(filter.updated_at_gt)
            .bind(filter.updated_at_gte)
            .bind(filter.updated_at_lt)
            .bind(filter.updated_at_lte)
            .bind(filter.updated_at_date)
            .bind(filter.search.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_by_creator(&self, user_id: i64) -> Result<Vec<Event>> {
        let events =
            sqlx::query_as::<_, Event>("SELECT * FROM events WHERE created_by = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_parses_prefix_and_field() {
        let order = EventOrder::parse("start_time").unwrap();
        assert_eq!(order.field, OrderField::StartTime);
        assert!(!order.descending);

        let order = EventOrder::parse("-start_time").unwrap();
        assert!(order.descending);

        assert!(EventOrder::parse("title").is_none());
        assert!(EventOrder::parse("-participant_count").is_none());
        assert!(EventOrder::parse("").is_none());
    }

    #[test]
    fn ordering_defaults_to_newest_first() {
        let order = EventOrder::default();
        assert_eq!(order.field, OrderField::CreatedAt);
        assert!(order.descending);
        assert_eq!(order.to_sql(), "created_at DESC");
    }

    #[test]
    fn ordering_sql_is_whitelisted() {
        for (param, sql) in [
            ("created_at", "created_at ASC"),
            ("-created_at", "created_at DESC"),
            ("updated_at", "updated_at ASC"),
            ("-updated_at", "updated_at DESC"),
            ("id", "id ASC"),
            ("-id", "id DESC"),
            ("start_time", "start_time ASC"),
            ("-start_time", "start_time DESC"),
        ] {
            assert_eq!(EventOrder::parse(param).unwrap().to_sql(), sql);
        }
    }
}
