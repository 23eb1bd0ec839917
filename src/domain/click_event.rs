//! Click event model for asynchronous click accounting.

use chrono::{DateTime, Utc};

/// Notice that a code has clicks waiting to be applied to the store.
///
/// Sent without blocking for the first pending click on a code; later clicks
/// are merged into the pending count. Consumed by
/// [`crate::domain::click_worker::run_click_worker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub code: String,
    pub clicked_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a click event stamped with the current time.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            clicked_at: Utc::now(),
        }
    }
}
