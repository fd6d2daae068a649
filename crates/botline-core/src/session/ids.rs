//! Message id generation.
//!
//! Ids look like millisecond timestamps but are issued by a monotonic
//! generator, so rapid submissions within the same millisecond still get
//! distinct, strictly increasing ids.

use botline_types::message::{Message, MessageId};
use chrono::Utc;

/// Issues strictly increasing [`MessageId`]s: `max(now_ms, last + 1)`.
#[derive(Debug, Clone, Default)]
pub struct MessageIdGenerator {
    last: u64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id.
    pub fn next_id(&mut self) -> MessageId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(self.last.saturating_add(1));
        self.last = id;
        MessageId(id)
    }

    /// Move the generator past every id in `messages`.
    ///
    /// Call after loading a stored session so new ids sort after restored ones.
    pub fn observe(&mut self, messages: &[Message]) {
        if let Some(max) = messages.iter().map(|m| m.id.0).max() {
            self.last = self.last.max(max);
        }
    }
}
