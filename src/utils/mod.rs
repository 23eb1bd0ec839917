//! Utility functions shared across layers.
//!
//! - [`codec`] - Base-62 short code encoding and decoding

pub mod codec;
