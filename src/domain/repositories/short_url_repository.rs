//! Repository trait for short URL records.

use crate::domain::entities::{NewShortUrl, PendingShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable storage of short URL records.
///
/// Creation is two-phase: [`insert`](Self::insert) allocates the identifier,
/// the caller derives the code from it, then [`set_code`](Self::set_code)
/// publishes the record. Until `set_code` succeeds no lookup can see it.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryShortUrlRepository`] - Process-local implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Inserts a record and assigns it a fresh, strictly increasing id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL exceeds the stored length.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn insert(&self, new_short_url: NewShortUrl) -> Result<PendingShortUrl, AppError>;

    /// Assigns the derived short code to a pending record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if another record already holds `code`.
    /// Returns [`AppError::NotFound`] if no pending record has `id`.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn set_code(&self, id: i64, code: &str) -> Result<(), AppError>;

    /// Finds a record by code, skipping records whose `expires_at` has passed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a record by code regardless of expiration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_any_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Atomically adds one click and stamps `last_clicked_at`.
    ///
    /// Returns `Ok(false)` when no record has `code`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn increment_click(&self, code: &str) -> Result<bool, AppError> {
        self.increment_click_by(code, 1).await
    }

    /// Atomically adds `count` clicks in one write and stamps `last_clicked_at`.
    ///
    /// Returns `Ok(false)` when no record has `code`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn increment_click_by(&self, code: &str, count: i64) -> Result<bool, AppError>;
}
