//! Comment domain - DB queries for comments
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions). A comment's back-references (video, author) are used only
//! for lookup and authorization; deleting a comment never touches either.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub video_id: i64,
    pub account_id: i64,
    #[serde(rename = "text")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Comment enriched with the author's display data at read time
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithAuthor {
    pub id: i64,
    pub video_id: i64,
    pub account_id: i64,
    #[serde(rename = "text")]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub channel_name: String,
    pub icon_url: Option<String>,
}

pub async fn insert_comment<'e, E>(
    executor: E,
    video_id: i64,
    account_id: i64,
    body: &str,
) -> Result<Comment, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO comments (video_id, account_id, body)
        VALUES ($1, $2, $3)
        RETURNING id, video_id, account_id, body, created_at
        "#,
    )
    .bind(video_id)
    .bind(account_id)
    .bind(body)
    .fetch_one(executor)
    .await
}

pub async fn get_comment<'e, E>(
    executor: E,
    comment_id: i64,
) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, video_id, account_id, body, created_at
        FROM comments WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(executor)
    .await
}

/// Comments for one video, oldest first, with author display data joined in
pub async fn list_comments_with_author<'e, E>(
    executor: E,
    video_id: i64,
    unknown_channel: &str,
) -> Result<Vec<CommentWithAuthor>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT c.id, c.video_id, c.account_id, c.body, c.created_at,
               COALESCE(a.channel_name, $2) AS channel_name,
               a.icon_url
        FROM comments c
        LEFT JOIN accounts a ON a.id = c.account_id
        WHERE c.video_id = $1
        ORDER BY c.id ASC
        "#,
    )
    .bind(video_id)
    .bind(unknown_channel)
    .fetch_all(executor)
    .await
}

pub async fn update_comment_body<'e, E>(
    executor: E,
    comment_id: i64,
    body: &str,
) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE comments SET body = $2
        WHERE id = $1
        RETURNING id, video_id, account_id, body, created_at
        "#,
    )
    .bind(comment_id)
    .bind(body)
    .fetch_optional(executor)
    .await
}

pub async fn delete_comment_row<'e, E>(executor: E, comment_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Cascade step for video deletion
pub async fn delete_comments_for_video<'e, E>(
    executor: E,
    video_id: i64,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM comments WHERE video_id = $1")
        .bind(video_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Cascade step for account deletion: comments the account authored anywhere
pub async fn delete_comments_by_author<'e, E>(
    executor: E,
    account_id: i64,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM comments WHERE account_id = $1")
        .bind(account_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Cascade step for account deletion: comments left by anyone on the
/// account's videos, which die with those videos
pub async fn delete_comments_on_account_videos<'e, E>(
    executor: E,
    account_id: i64,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM comments
        WHERE video_id IN (SELECT id FROM videos WHERE account_id = $1)
        "#,
    )
    .bind(account_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{accounts, videos};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_comment_requires_live_video(pool: PgPool) {
        let account = accounts::insert_account(&pool, "alice", "AliceTV", None, "1.2.3.4")
            .await
            .unwrap();
        let video_id = videos::insert_video(&pool, account.id, "Hi", "", "videos/user_1/a.mp4")
            .await
            .unwrap();

        // A video-deletion cascade commits between a caller's existence
        // check and its insert
        let mut tx = pool.begin().await.unwrap();
        delete_comments_for_video(&mut *tx, video_id).await.unwrap();
        videos::delete_video_row(&mut *tx, video_id).await.unwrap();
        tx.commit().await.unwrap();

        // The late insert must fail instead of leaving an orphan comment
        let err = insert_comment(&pool, video_id, account.id, "late")
            .await
            .unwrap_err();
        assert!(
            matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
        );

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = $1")
            .bind(video_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
