//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, PendingShortUrl, ShortUrl};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

const SELECT_COLUMNS: &str = r#"
    SELECT id, short_code, original_url, created_at, expires_at, click_count, last_clicked_at
    FROM short_urls
"#;

/// PostgreSQL repository for short URL records.
///
/// A pending record has `short_code = NULL`. Lookups compare with `= $1`,
/// which never matches NULL, so pending rows stay invisible.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
}

impl PgShortUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn insert(&self, new_short_url: NewShortUrl) -> Result<PendingShortUrl, AppError> {
        let pending = sqlx::query_as::<_, PendingShortUrl>(
            r#"
            INSERT INTO short_urls (original_url, created_at, expires_at)
            VALUES ($1, NOW(), $2)
            RETURNING id, original_url, created_at, expires_at
            "#,
        )
        .bind(&new_short_url.original_url)
        .bind(new_short_url.expires_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(pending)
    }

    async fn set_code(&self, id: i64, code: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET short_code = $2
            WHERE id = $1 AND short_code IS NULL
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "No pending short URL with this id",
                json!({ "id": id, "code": code }),
            ));
        }

        Ok(())
    }

    async fn find_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        let query = format!(
            "{SELECT_COLUMNS} WHERE short_code = $1 AND (expires_at IS NULL OR expires_at > NOW())"
        );

        let record = sqlx::query_as::<_, ShortUrl>(&query)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(record)
    }

    async fn find_any_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        let query = format!("{SELECT_COLUMNS} WHERE short_code = $1");

        let record = sqlx::query_as::<_, ShortUrl>(&query)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(record)
    }

    async fn increment_click_by(&self, code: &str, count: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET click_count = click_count + $2,
                last_clicked_at = NOW()
            WHERE short_code = $1
            "#,
        )
        .bind(code)
        .bind(count)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
