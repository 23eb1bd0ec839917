//! Process-local implementation of the short URL repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{
    MAX_ORIGINAL_URL_LENGTH, NewShortUrl, PendingShortUrl, ShortUrl, short_url::is_expired_at,
};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

/// Stored row. `short_code` is `None` while the record is pending.
#[derive(Debug, Clone)]
struct Row {
    short_code: Option<String>,
    original_url: String,
    created_at: chrono::DateTime<Utc>,
    expires_at: Option<chrono::DateTime<Utc>>,
    click_count: i64,
    last_clicked_at: Option<chrono::DateTime<Utc>>,
}

impl Row {
    fn to_record(&self, id: i64, short_code: &str) -> ShortUrl {
        ShortUrl {
            id,
            short_code: short_code.to_string(),
            original_url: self.original_url.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            click_count: self.click_count,
            last_clicked_at: self.last_clicked_at,
        }
    }
}

/// In-memory repository built on `DashMap`.
///
/// Rows are keyed by id; a second map indexes published codes. Identifiers
/// come from an atomic counter, code uniqueness is enforced on the index
/// entry, and click increments happen under the row's shard lock.
/// Nothing survives a restart.
#[derive(Debug)]
pub struct InMemoryShortUrlRepository {
    rows: DashMap<i64, Row>,
    codes: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl InMemoryShortUrlRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            codes: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored records, pending ones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn find(&self, code: &str) -> Option<ShortUrl> {
        let id = *self.codes.get(code)?;
        let row = self.rows.get(&id)?;
        Some(row.to_record(id, code))
    }
}

impl Default for InMemoryShortUrlRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShortUrlRepository for InMemoryShortUrlRepository {
    async fn insert(&self, new_short_url: NewShortUrl) -> Result<PendingShortUrl, AppError> {
        if new_short_url.original_url.chars().count() > MAX_ORIGINAL_URL_LENGTH {
            return Err(AppError::bad_request(
                "Original URL is too long",
                json!({ "max_length": MAX_ORIGINAL_URL_LENGTH }),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = Row {
            short_code: None,
            original_url: new_short_url.original_url,
            created_at: Utc::now(),
            expires_at: new_short_url.expires_at,
            click_count: 0,
            last_clicked_at: None,
        };

        let pending = PendingShortUrl {
            id,
            original_url: row.original_url.clone(),
            created_at: row.created_at,
            expires_at: row.expires_at,
        };
        self.rows.insert(id, row);

        Ok(pending)
    }

    async fn set_code(&self, id: i64, code: &str) -> Result<(), AppError> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Err(AppError::not_found(
                "No pending short URL with this id",
                json!({ "id": id, "code": code }),
            ));
        };

        if row.short_code.is_some() {
            return Err(AppError::not_found(
                "No pending short URL with this id",
                json!({ "id": id, "code": code }),
            ));
        }

        match self.codes.entry(code.to_string()) {
            Entry::Occupied(existing) => Err(AppError::conflict(
                "Short code already assigned",
                json!({ "code": code, "owner_id": *existing.get() }),
            )),
            Entry::Vacant(slot) => {
                row.short_code = Some(code.to_string());
                slot.insert(id);
                Ok(())
            }
        }
    }

    async fn find_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        let now = Utc::now();
        Ok(self
            .find(code)
            .filter(|record| !is_expired_at(record.expires_at, now)))
    }

    async fn find_any_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        Ok(self.find(code))
    }

    async fn increment_click_by(&self, code: &str, count: i64) -> Result<bool, AppError> {
        let Some(id) = self.codes.get(code).map(|entry| *entry.value()) else {
            return Ok(false);
        };

        match self.rows.get_mut(&id) {
            Some(mut row) => {
                row.click_count += count;
                row.last_clicked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
