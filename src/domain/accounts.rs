//! Account domain - DB queries for accounts
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions, e.g. the account deletion cascade).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub display_name: String,
    pub channel_name: String,
    pub icon_url: Option<String>,
    pub created_at: DateTime<Utc>,
    // origin_ip intentionally omitted - internal anti-abuse signal only
}

/// Insert a new account bound to an origin signal. The unique index on
/// origin_ip makes concurrent registrations from one origin serialize in
/// Postgres; the caller maps the unique violation to a rate-limit error.
pub async fn insert_account<'e, E>(
    executor: E,
    display_name: &str,
    channel_name: &str,
    icon_url: Option<&str>,
    origin_ip: &str,
) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO accounts (display_name, channel_name, icon_url, origin_ip)
        VALUES ($1, $2, $3, $4)
        RETURNING id, display_name, channel_name, icon_url, created_at
        "#,
    )
    .bind(display_name)
    .bind(channel_name)
    .bind(icon_url)
    .bind(origin_ip)
    .fetch_one(executor)
    .await
}

pub async fn get_account<'e, E>(executor: E, account_id: i64) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, display_name, channel_name, icon_url, created_at
        FROM accounts WHERE id = $1
        "#,
    )
    .bind(account_id)
    .fetch_optional(executor)
    .await
}

/// Look up an account by channel name (login path)
pub async fn find_by_channel_name<'e, E>(
    executor: E,
    channel_name: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, display_name, channel_name, icon_url, created_at
        FROM accounts WHERE channel_name = $1
        "#,
    )
    .bind(channel_name)
    .fetch_optional(executor)
    .await
}

/// Partial update of display fields. Identifier and origin signal are
/// immutable; absent fields keep their current value. The icon is nullable,
/// so its patch distinguishes "absent" (`None`, keep) from "explicit null"
/// (`Some(None)`, clear).
pub async fn update_account<'e, E>(
    executor: E,
    account_id: i64,
    display_name: Option<&str>,
    channel_name: Option<&str>,
    icon_url: Option<Option<&str>>,
) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE accounts
        SET display_name = COALESCE($2, display_name),
            channel_name = COALESCE($3, channel_name),
            icon_url = CASE WHEN $4 THEN $5 ELSE icon_url END
        WHERE id = $1
        RETURNING id, display_name, channel_name, icon_url, created_at
        "#,
    )
    .bind(account_id)
    .bind(display_name)
    .bind(channel_name)
    .bind(icon_url.is_some())
    .bind(icon_url.flatten())
    .fetch_optional(executor)
    .await
}

/// Delete the account row only. The deletion cascade removes dependents
/// first; this runs last inside the same transaction.
pub async fn delete_account_row<'e, E>(executor: E, account_id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(account_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_update_distinguishes_absent_icon_from_null(pool: PgPool) {
        let account = insert_account(&pool, "alice", "AliceTV", Some("http://a/icon.png"), "1.2.3.4")
            .await
            .unwrap();

        // Absent icon leaves it untouched
        let updated = update_account(&pool, account.id, Some("alice2"), None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name, "alice2");
        assert_eq!(updated.icon_url.as_deref(), Some("http://a/icon.png"));

        // Explicit null clears it
        let updated = update_account(&pool, account.id, None, None, Some(None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.icon_url, None);

        // And it can be set again afterwards
        let updated = update_account(&pool, account.id, None, None, Some(Some("http://a/new.png")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.icon_url.as_deref(), Some("http://a/new.png"));
    }

    #[sqlx::test]
    async fn test_origin_signal_unique(pool: PgPool) {
        insert_account(&pool, "alice", "AliceTV", None, "1.2.3.4")
            .await
            .unwrap();

        let err = insert_account(&pool, "mallory", "MalloryTV", None, "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(db) if db.is_unique_violation()));
    }
}
