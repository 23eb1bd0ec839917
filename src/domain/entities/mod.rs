//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures; persistence and caching live in
//! [`crate::infrastructure`].
//!
//! # Entity Types
//!
//! - [`ShortUrl`] - A stored short URL with click statistics
//! - [`PendingShortUrl`] - An inserted record still waiting for its code
//! - [`ShortUrlView`] / [`UrlStats`] - Read models handed to callers

pub mod short_url;

pub use short_url::{
    MAX_ORIGINAL_URL_LENGTH, NewShortUrl, PendingShortUrl, ShortUrl, ShortUrlView, UrlStats,
};
