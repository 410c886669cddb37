//! Refresh Token Repository
//!
//! Every issued refresh token is recorded by its jti. A token is only
//! honored while its row exists and is not blacklisted, so rotation and
//! logout both reduce to flipping the flag.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;

pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        jti: &str,
        user_id: i64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, issued_at, expires_at, blacklisted)
            VALUES ($1, $2, $3, $4, FALSE)
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(issued_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// A refresh token is active only if it was issued by us and has not
    /// been blacklisted. Unknown jtis count as inactive.
    pub async fn is_active(&self, jti: &str) -> Result<bool> {
        let active: Option<bool> =
            sqlx::query_scalar("SELECT NOT blacklisted FROM refresh_tokens WHERE jti = $1")
                .bind(jti)
                .fetch_optional(&self.pool)
                .await?;
        Ok(active.unwrap_or(false))
    }

    pub async fn blacklist(&self, jti: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET blacklisted = TRUE WHERE jti = $1")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn blacklist_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET blacklisted = TRUE WHERE user_id = $1 AND NOT blacklisted",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Drops rows whose tokens can no longer validate anyway. Called
    /// opportunistically; failures are not fatal to the caller.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
