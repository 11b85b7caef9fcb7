//! Video domain - DB queries for the catalog
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions, e.g. video and account deletion cascades).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

#[derive(Debug, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub account_id: i64,
    pub title: String,
    pub description: String,
    pub storage_path: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Catalog row enriched with the owner's display data at read time.
/// The join is LEFT so a missing or incomplete owner degrades to a
/// placeholder channel label instead of failing the listing.
#[derive(Debug, sqlx::FromRow)]
pub struct VideoWithOwner {
    pub id: i64,
    pub account_id: i64,
    pub title: String,
    pub description: String,
    pub storage_path: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub channel_name: String,
    pub icon_url: Option<String>,
}

/// Insert a catalog entry for a fully-stored payload. Only the upload
/// pipeline calls this, and only after the storage transfer is acknowledged.
pub async fn insert_video<'e, E>(
    executor: E,
    account_id: i64,
    title: &str,
    description: &str,
    storage_path: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO videos (account_id, title, description, storage_path)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(account_id)
    .bind(title)
    .bind(description)
    .bind(storage_path)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

pub async fn get_video<'e, E>(executor: E, video_id: i64) -> Result<Option<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, account_id, title, description, storage_path, view_count, created_at
        FROM videos WHERE id = $1
        "#,
    )
    .bind(video_id)
    .fetch_optional(executor)
    .await
}

/// Full catalog listing, newest first, with owner display data joined in
pub async fn list_videos_with_owner<'e, E>(
    executor: E,
    unknown_channel: &str,
) -> Result<Vec<VideoWithOwner>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT v.id, v.account_id, v.title, v.description, v.storage_path,
               v.view_count, v.created_at,
               COALESCE(a.channel_name, $1) AS channel_name,
               a.icon_url
        FROM videos v
        LEFT JOIN accounts a ON a.id = v.account_id
        ORDER BY v.id DESC
        "#,
    )
    .bind(unknown_channel)
    .fetch_all(executor)
    .await
}

/// Atomic read-modify-write; concurrent viewers never lose increments
/// because the addition happens inside the single UPDATE statement.
pub async fn increment_view_count<'e, E>(
    executor: E,
    video_id: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        UPDATE videos SET view_count = view_count + 1
        WHERE id = $1
        RETURNING view_count
        "#,
    )
    .bind(video_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(count,)| count))
}

/// Storage locators for every video owned by an account, collected before
/// the cascade so the objects can be released after the rows are gone.
pub async fn storage_paths_for_account<'e, E>(
    executor: E,
    account_id: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar("SELECT storage_path FROM videos WHERE account_id = $1")
        .bind(account_id)
        .fetch_all(executor)
        .await
}

pub async fn delete_video_row<'e, E>(executor: E, video_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_videos_for_account<'e, E>(
    executor: E,
    account_id: i64,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM videos WHERE account_id = $1")
        .bind(account_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::accounts;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_concurrent_increments_lose_no_updates(pool: PgPool) {
        let owner = accounts::insert_account(&pool, "Counter", "counter_tv", None, "203.0.113.9")
            .await
            .unwrap();
        let video_id = insert_video(&pool, owner.id, "Busy", "d", "videos/counter/busy.mp4")
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..25 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                increment_view_count(&pool, video_id).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().unwrap().is_some());
        }

        let video = get_video(&pool, video_id).await.unwrap().unwrap();
        assert_eq!(video.view_count, 25);
    }

    #[sqlx::test]
    async fn test_increment_on_unknown_video_is_none(pool: PgPool) {
        assert_eq!(increment_view_count(&pool, 999_999).await.unwrap(), None);
    }
}
