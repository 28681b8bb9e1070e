//! Post storage: owner-scoped CRUD and the due-post claim used by the sweep

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{DbError, PostlineError, Result};
use crate::types::{Post, PostStatus};

pub struct PostRepository {
    db: Arc<Database>,
}

/// Partial update applied by [`PostRepository::update`]. Unset fields are
/// left untouched; `updated_at` is always stamped.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<PostStatus>,
    pub scheduled_for: Option<i64>,
}

impl PostRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new post row
    pub async fn create(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (
                id, owner_id, title, body, category, status, scheduled_for,
                published_to_external, external_id, image_url, ai_generated,
                source_topic, error_message, claimed_at, created_at, updated_at,
                published_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.owner_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.category)
        .bind(post.status.as_str())
        .bind(post.scheduled_for)
        .bind(post.published_to_external as i32)
        .bind(&post.external_id)
        .bind(&post.image_url)
        .bind(post.ai_generated as i32)
        .bind(&post.source_topic)
        .bind(&post.error_message)
        .bind(post.claimed_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.published_at)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post, enforcing ownership
    pub async fn get(&self, owner_id: &str, post_id: &str) -> Result<Option<Post>> {
        match self.get_by_id(post_id).await? {
            Some(post) if post.owner_id != owner_id => Err(PostlineError::NotAuthorized(format!(
                "post {} does not belong to {}",
                post_id, owner_id
            ))),
            other => Ok(other),
        }
    }

    /// Get a post by id without an ownership check. Pipeline use only.
    pub async fn get_by_id(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| row_to_post(&r)))
    }

    /// List all posts for an owner, newest first
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM posts
            WHERE owner_id = ?
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows.iter().map(row_to_post).collect())
    }

    /// List an owner's posts in one lifecycle status, newest first
    pub async fn list_by_owner_and_status(
        &self,
        owner_id: &str,
        status: PostStatus,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM posts
            WHERE owner_id = ? AND status = ?
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(owner_id)
        .bind(status.as_str())
        .fetch_all(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows.iter().map(row_to_post).collect())
    }

    /// Apply a partial update, enforcing ownership and stamping `updated_at`.
    ///
    /// Moving a post into the scheduled status requires a publication time
    /// that lies in the future. Re-saving a failed post as draft or scheduled
    /// clears the stored error message, so a manual retry starts clean.
    pub async fn update(&self, owner_id: &str, post_id: &str, update: PostUpdate) -> Result<Post> {
        let mut post = self
            .get(owner_id, post_id)
            .await?
            .ok_or_else(|| PostlineError::InvalidInput(format!("Post not found: {}", post_id)))?;

        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(body) = update.body {
            post.body = body;
        }
        if let Some(category) = update.category {
            post.category = Some(category);
        }
        if let Some(image_url) = update.image_url {
            post.image_url = Some(image_url);
        }
        if let Some(scheduled_for) = update.scheduled_for {
            post.scheduled_for = Some(scheduled_for);
        }
        if let Some(status) = update.status {
            post.status = status;
            if matches!(status, PostStatus::Draft | PostStatus::Scheduled) {
                post.error_message = None;
                post.claimed_at = None;
            }
        }
        post.updated_at = chrono::Utc::now().timestamp();

        // Entering the scheduled status, or moving the time of a scheduled
        // post, requires a future timestamp. Editing other fields of a
        // post that has since come due stays allowed.
        let reschedules = post.status == PostStatus::Scheduled
            && (update.status.is_some() || update.scheduled_for.is_some());
        if reschedules {
            match post.scheduled_for {
                Some(t) if t > post.updated_at => {}
                Some(_) => {
                    return Err(PostlineError::InvalidInput(
                        "Scheduled time must be in the future".to_string(),
                    ))
                }
                None => {
                    return Err(PostlineError::InvalidInput(
                        "Scheduling requires a scheduled time".to_string(),
                    ))
                }
            }
        }

        sqlx::query(
            r#"
            UPDATE posts SET
                title = ?, body = ?, category = ?, image_url = ?, status = ?,
                scheduled_for = ?, error_message = ?, claimed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.category)
        .bind(&post.image_url)
        .bind(post.status.as_str())
        .bind(post.scheduled_for)
        .bind(&post.error_message)
        .bind(post.claimed_at)
        .bind(post.updated_at)
        .bind(&post.id)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(post)
    }

    /// Delete a post, enforcing ownership. The analytics row goes with it.
    pub async fn delete(&self, owner_id: &str, post_id: &str) -> Result<()> {
        // Ownership check first; a mismatch must not delete anything
        self.get(owner_id, post_id).await?;

        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(self.db.pool())
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Atomically claim the batch of due posts for one sweep.
    ///
    /// The conditional update on `claimed_at` is the hand-off between
    /// overlapping sweeps: a post already claimed within the lease window is
    /// skipped, and a claim left behind by a crashed sweep lapses after
    /// `lease_secs`. Results are ordered by `(scheduled_for, id)` ascending.
    pub async fn claim_due(&self, now: i64, batch: usize, lease_secs: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            UPDATE posts SET claimed_at = ?1, updated_at = ?1
            WHERE id IN (
                SELECT id FROM posts
                WHERE status = 'scheduled'
                  AND published_to_external = 0
                  AND scheduled_for IS NOT NULL
                  AND scheduled_for <= ?1
                  AND (claimed_at IS NULL OR claimed_at <= ?2)
                ORDER BY scheduled_for ASC, id ASC
                LIMIT ?3
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now - lease_secs)
        .bind(batch as i64)
        .fetch_all(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        let mut posts: Vec<Post> = rows.iter().map(row_to_post).collect();
        // RETURNING does not guarantee row order
        posts.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(posts)
    }

    /// Record a successful publication
    pub async fn mark_published(&self, post_id: &str, external_id: &str, now: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET
                status = 'published', published_to_external = 1, external_id = ?,
                published_at = ?, error_message = NULL, claimed_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(external_id)
        .bind(now)
        .bind(now)
        .bind(post_id)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Record a failed publication attempt with a human-readable reason
    pub async fn mark_failed(&self, post_id: &str, reason: &str, now: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET
                status = 'failed', error_message = ?, claimed_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(post_id)
        .execute(self.db.pool())
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }
}

fn row_to_post(r: &SqliteRow) -> Post {
    Post {
        id: r.get("id"),
        owner_id: r.get("owner_id"),
        title: r.get("title"),
        body: r.get("body"),
        category: r.get("category"),
        status: PostStatus::parse(&r.get::<String, _>("status")).unwrap_or(PostStatus::Draft),
        scheduled_for: r.get("scheduled_for"),
        published_to_external: r.get::<i64, _>("published_to_external") != 0,
        external_id: r.get("external_id"),
        image_url: r.get("image_url"),
        ai_generated: r.get::<i64, _>("ai_generated") != 0,
        source_topic: r.get("source_topic"),
        error_message: r.get("error_message"),
        claimed_at: r.get("claimed_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        published_at: r.get("published_at"),
    }
}
