//! Analytics storage, one record per published post

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{DbError, Result};
use crate::types::Analytics;

pub struct AnalyticsStore {
    db: Arc<Database>,
}

impl AnalyticsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create the zero-valued record for a freshly published post.
    ///
    /// Idempotent: an existing record (from an earlier publish attempt) is
    /// left untouched.
    pub async fn seed_for_post(&self, post_id: &str, now: i64) -> Result<Analytics> {
        sqlx::query(
            r#"
            INSERT INTO analytics (post_id, last_refreshed)
            VALUES (?, ?)
            ON CONFLICT(post_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(self
            .get(post_id)
            .await?
            .unwrap_or_else(|| Analytics::zeroed(post_id, now)))
    }

    /// Write a full analytics record, replacing any existing one
    pub async fn upsert(&self, analytics: &Analytics) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analytics (
                post_id, impressions, clicks, likes, comments, shares,
                engagement_rate, last_refreshed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(post_id) DO UPDATE SET
                impressions = excluded.impressions,
                clicks = excluded.clicks,
                likes = excluded.likes,
                comments = excluded.comments,
                shares = excluded.shares,
                engagement_rate = excluded.engagement_rate,
                last_refreshed = excluded.last_refreshed
            "#,
        )
        .bind(&analytics.post_id)
        .bind(analytics.impressions)
        .bind(analytics.clicks)
        .bind(analytics.likes)
        .bind(analytics.comments)
        .bind(analytics.shares)
        .bind(analytics.engagement_rate)
        .bind(analytics.last_refreshed)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn get(&self, post_id: &str) -> Result<Option<Analytics>> {
        let row = sqlx::query("SELECT * FROM analytics WHERE post_id = ?")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| row_to_analytics(&r)))
    }
}

fn row_to_analytics(r: &SqliteRow) -> Analytics {
    Analytics {
        post_id: r.get("post_id"),
        impressions: r.get("impressions"),
        clicks: r.get("clicks"),
        likes: r.get("likes"),
        comments: r.get("comments"),
        shares: r.get("shares"),
        engagement_rate: r.get("engagement_rate"),
        last_refreshed: r.get("last_refreshed"),
    }
}
