use std::time::Instant;

use wrp_core::Message;

/// A queued message paired with the instant it was enqueued, used both for
/// tie-breaking (§4.3) and TTL expiry (§4.4).
#[derive(Debug, Clone)]
pub struct PriorityQueueItem {
    pub message: Message,
    pub enqueued_at: Instant,
}

impl PriorityQueueItem {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            enqueued_at: Instant::now(),
        }
    }

    pub fn payload_len(&self) -> usize {
        self.message.payload.len()
    }
}
