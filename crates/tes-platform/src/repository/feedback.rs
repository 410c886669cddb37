//! Feedback Repository

use sqlx::PgPool;

use crate::domain::Feedback;
use crate::error::Result;

pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, feedback: &Feedback) -> Result<Feedback> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedbacks (user_id, event_id, text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(feedback.user_id)
        .bind(feedback.event_id)
        .bind(&feedback.text)
        .bind(feedback.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<Feedback>> {
        let feedbacks = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedbacks WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedbacks)
    }
}
