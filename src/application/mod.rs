//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating the record
//! store, the cache and the click queue. Services consume repository traits
//! and provide a clean API for the routing layer.
//!
//! # Available Services
//!
//! - [`services::shortener_service::ShortenerService`] - Creation, resolution, details, stats and click accounting

pub mod services;
