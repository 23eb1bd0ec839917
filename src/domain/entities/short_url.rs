//! Short URL record and the views built from it.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Longest original URL the store accepts.
pub const MAX_ORIGINAL_URL_LENGTH: usize = 2048;

/// A stored short URL with its click statistics.
///
/// Only `click_count` and `last_clicked_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ShortUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Relative redirect path for this record, e.g. `/aaaaab`.
    pub fn relative_path(&self) -> String {
        format!("/{}", self.short_code)
    }

    pub fn to_view(&self) -> ShortUrlView {
        ShortUrlView {
            short_code: self.short_code.clone(),
            short_url: self.relative_path(),
            original_url: self.original_url.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            click_count: self.click_count,
        }
    }

    pub fn to_stats(&self) -> UrlStats {
        UrlStats {
            short_code: self.short_code.clone(),
            original_url: self.original_url.clone(),
            total_clicks: self.click_count,
            created_at: self.created_at,
            last_clicked_at: self.last_clicked_at,
        }
    }
}

/// Returns true if `expires_at` is set and not after `now`.
pub fn is_expired_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|e| now >= e)
}

/// Input data for inserting a new record.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub original_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly inserted record whose short code has not been assigned yet.
///
/// Records in this state are invisible to every lookup.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingShortUrl {
    pub id: i64,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PendingShortUrl {
    /// Completes the record with its derived code.
    pub fn with_code(self, short_code: String) -> ShortUrl {
        ShortUrl {
            id: self.id,
            short_code,
            original_url: self.original_url,
            created_at: self.created_at,
            expires_at: self.expires_at,
            click_count: 0,
            last_clicked_at: None,
        }
    }
}

/// Public representation of a short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlView {
    pub short_code: String,
    /// Relative path; see [`ShortUrlView::absolute_url`].
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
}

impl ShortUrlView {
    /// Joins the relative path onto a public base URL.
    pub fn absolute_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.short_url)
    }
}

/// Click statistics for a short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStats {
    pub short_code: String,
    pub original_url: String,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub last_clicked_at: Option<DateTime<Utc>>,
}
