use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Post, StoredPost, Subscription, SubscriptionStatus};

use super::schema::{POSTS_CURSOR, SCHEMA};

const POST_COLUMNS: &str = "p.id, p.subject, p.preview_text, p.received_at, p.url, \
                            p.cover_image_url, p.subscription_id, p.is_read, s.name";

/// Local store for subscriptions, posts and pagination cursors.
///
/// Every call runs on the connection's single worker thread, so writes are
/// serialized without any locking on this side.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref().to_path_buf()).await?;
        Self::init(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Subscription operations

    /// Authoritative upsert: overwrites every field except the id, which also
    /// fills in any placeholder created earlier by a post.
    /// Inserts or updates each subscription. Returns how many ids were new.
    pub async fn upsert_subscriptions(&self, subscriptions: Vec<Subscription>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut exists_stmt = tx.prepare_cached(
                        "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE id = ?1)",
                    )?;
                    let mut stmt = tx.prepare_cached(
                        r#"INSERT INTO subscriptions (id, name, description, opt_in, status)
                           VALUES (?1, ?2, ?3, ?4, ?5)
                           ON CONFLICT(id) DO UPDATE SET
                               name = excluded.name,
                               description = excluded.description,
                               opt_in = excluded.opt_in,
                               status = excluded.status"#,
                    )?;
                    for sub in &subscriptions {
                        // A placeholder row already exists and is filled in, not inserted.
                        let exists: bool = exists_stmt.query_row(params![sub.id], |row| row.get(0))?;
                        if !exists {
                            inserted += 1;
                        }
                        stmt.execute(params![
                            sub.id,
                            sub.name,
                            sub.description,
                            sub.opt_in,
                            sub.status.as_str(),
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        tracing::debug!("Upserted subscriptions, {} new", inserted);
        Ok(inserted)
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let id = id.to_string();
        let subscription = self
            .conn
            .call(move |conn| {
                let subscription = conn
                    .query_row(
                        "SELECT id, name, description, opt_in, status FROM subscriptions WHERE id = ?1",
                        params![id],
                        subscription_from_row,
                    )
                    .optional()?;
                Ok(subscription)
            })
            .await?;
        Ok(subscription)
    }

    /// All subscriptions by name; placeholders (no name yet) sort last.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let subscriptions = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, description, opt_in, status FROM subscriptions \
                     ORDER BY name IS NULL, name, id",
                )?;
                let subscriptions = stmt
                    .query_map([], subscription_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscriptions)
            })
            .await?;
        Ok(subscriptions)
    }

    // Post operations

    /// Merges a batch of posts in one transaction and returns how many were new.
    pub async fn merge_posts(&self, posts: Vec<Post>) -> Result<usize> {
        self.merge(posts, false).await
    }

    /// Commits the result of a finished pagination walk: the posts and the
    /// cleared posts cursor land together or not at all.
    pub async fn merge_posts_and_clear_cursor(&self, posts: Vec<Post>) -> Result<usize> {
        self.merge(posts, true).await
    }

    async fn merge(&self, posts: Vec<Post>, clear_cursor: bool) -> Result<usize> {
        let received = posts.len();
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let inserted = merge_posts_in(&tx, &posts)?;
                if clear_cursor {
                    write_cursor(&tx, POSTS_CURSOR, None)?;
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        tracing::debug!("Merged {} posts ({} new)", received, inserted);
        Ok(inserted)
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Option<StoredPost>> {
        let post = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {POST_COLUMNS} FROM posts p \
                     LEFT JOIN subscriptions s ON p.subscription_id = s.id \
                     WHERE p.id = ?1"
                );
                let post = conn
                    .query_row(&sql, params![id.to_string()], stored_post_from_row)
                    .optional()?;
                Ok(post)
            })
            .await?;
        Ok(post)
    }

    /// Looks a post up by its textual id; a malformed id is simply not found.
    pub async fn get_post_by_str(&self, id: &str) -> Result<Option<StoredPost>> {
        match Uuid::parse_str(id) {
            Ok(uuid) => self.get_post(uuid).await,
            Err(e) => {
                tracing::warn!("Invalid post id {:?}: {}", id, e);
                Ok(None)
            }
        }
    }

    /// Posts newest first, optionally limited to one subscription.
    pub async fn list_posts(&self, subscription_id: Option<&str>) -> Result<Vec<StoredPost>> {
        let subscription_id = subscription_id.map(str::to_string);
        let posts = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {POST_COLUMNS} FROM posts p \
                     LEFT JOIN subscriptions s ON p.subscription_id = s.id \
                     WHERE ?1 IS NULL OR p.subscription_id = ?1 \
                     ORDER BY p.received_at DESC, p.id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let posts = stmt
                    .query_map(params![subscription_id], stored_post_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }

    /// Marks a post read. Returns false when no such post exists.
    pub async fn mark_post_read(&self, id: Uuid) -> Result<bool> {
        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE posts SET is_read = 1 WHERE id = ?1",
                    params![id.to_string()],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(updated)
    }

    /// Number of unread posts, used for the badge.
    pub async fn unread_count(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM posts WHERE is_read = 0", [], |row| {
                        row.get(0)
                    })?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // Cursor operations

    pub async fn get_cursor(&self, entity: &str) -> Result<Option<String>> {
        let entity = entity.to_string();
        let cursor = self
            .conn
            .call(move |conn| {
                let cursor: Option<Option<String>> = conn
                    .query_row(
                        "SELECT cursor FROM cursors WHERE entity = ?1",
                        params![entity],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(cursor.flatten())
            })
            .await?;
        Ok(cursor)
    }

    pub async fn set_cursor(&self, entity: &str, cursor: Option<String>) -> Result<()> {
        let entity = entity.to_string();
        self.conn
            .call(move |conn| {
                write_cursor(conn, &entity, cursor.as_deref())?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn posts_cursor(&self) -> Result<Option<String>> {
        self.get_cursor(POSTS_CURSOR).await
    }

    /// Drops every row from every table.
    pub async fn reset(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM posts", [])?;
                tx.execute("DELETE FROM subscriptions", [])?;
                tx.execute("DELETE FROM cursors", [])?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        tracing::info!("Inbox store reset");
        Ok(())
    }
}

/// Upserts each post, creating placeholder subscriptions for unknown ids
/// inside the caller's transaction.
fn merge_posts_in(tx: &Transaction, posts: &[Post]) -> rusqlite::Result<usize> {
    let mut placeholder_stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO subscriptions (id, name, description, opt_in, status) \
         VALUES (?1, NULL, NULL, 1, ?2)",
    )?;
    let mut exists_stmt = tx.prepare_cached("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)")?;
    let mut upsert_stmt = tx.prepare_cached(
        r#"INSERT INTO posts (id, subject, preview_text, received_at, url, cover_image_url, subscription_id, is_read)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(id) DO UPDATE SET
               subject = excluded.subject,
               preview_text = excluded.preview_text,
               received_at = excluded.received_at,
               url = excluded.url,
               cover_image_url = excluded.cover_image_url,
               subscription_id = excluded.subscription_id,
               is_read = posts.is_read OR excluded.is_read"#,
    )?;

    let mut inserted = 0;
    for post in posts {
        if let Some(subscription_id) = &post.subscription_id {
            let created = placeholder_stmt.execute(params![
                subscription_id,
                SubscriptionStatus::Published.as_str()
            ])?;
            if created > 0 {
                tracing::debug!(
                    "Post {} references unknown subscription {}, created placeholder",
                    post.id,
                    subscription_id
                );
            }
        }

        let id = post.id.to_string();
        let exists: bool = exists_stmt.query_row(params![id], |row| row.get(0))?;

        upsert_stmt.execute(params![
            id,
            post.subject,
            post.preview_text,
            format_datetime(&post.received_at),
            post.url,
            post.cover_image_url,
            post.subscription_id,
            post.is_read,
        ])?;

        if !exists {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn write_cursor(conn: &rusqlite::Connection, entity: &str, cursor: Option<&str>) -> rusqlite::Result<()> {
    conn.execute(
        r#"INSERT INTO cursors (entity, cursor) VALUES (?1, ?2)
           ON CONFLICT(entity) DO UPDATE SET cursor = excluded.cursor"#,
        params![entity, cursor],
    )?;
    Ok(())
}

/// Fixed-width UTC form so TEXT ordering matches chronological ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn subscription_from_row(row: &Row) -> rusqlite::Result<Subscription> {
    let status: String = row.get(4)?;
    Ok(Subscription {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        opt_in: row.get(3)?,
        status: status.parse().unwrap_or_default(),
    })
}

fn stored_post_from_row(row: &Row) -> rusqlite::Result<StoredPost> {
    let id: String = row.get(0)?;
    let received_at: String = row.get(3)?;

    let post = Post {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e.to_string()))?,
        subject: row.get(1)?,
        preview_text: row.get(2)?,
        received_at: parse_datetime(&received_at)
            .ok_or_else(|| conversion_error(3, format!("invalid timestamp {received_at:?}")))?,
        url: row.get(4)?,
        cover_image_url: row.get(5)?,
        subscription_id: row.get(6)?,
        is_read: row.get(7)?,
    };

    Ok(StoredPost {
        post,
        subscription_name: row.get(8)?,
    })
}
