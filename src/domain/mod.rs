//! Domain layer containing business entities and logic.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click accounting event model
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. A short code is resolved for a redirect
//! 2. [`click_worker::ClickRecorder`] adds the click to the code's pending count
//!    and, for the first pending click, pushes a [`click_event::ClickEvent`]
//!    to a bounded channel without waiting
//! 3. [`click_worker::run_click_worker`] takes the pending counts and applies
//!    them with bounded concurrency
//! 4. Each count is added atomically via [`repositories::ShortUrlRepository`]

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod repositories;
