//! Configuration surface for [`crate::PriorityQueue`] (§6).

/// Default `max_queue_bytes` when the caller passes `0` ("use the default").
pub const DEFAULT_MAX_QUEUE_BYTES: u64 = 1024 * 1024;
/// Default `max_message_bytes` when the caller passes `0`.
pub const DEFAULT_MAX_MESSAGE_BYTES: u64 = 256 * 1024;

/// Tie-break applied when two items share a QoS class in normal mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PriorityPolicy {
    /// The later-enqueued item is "greater".
    #[default]
    Newest,
    /// The earlier-enqueued item is "greater".
    Oldest,
}

/// Tie-break applied among same-class items while trimming (§4.3). Selected
/// independently from [`PriorityPolicy`]; defaults to evicting the oldest
/// item within the lowest class first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrimTieBreak {
    #[default]
    Oldest,
    Newest,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueueConfig {
    pub max_queue_bytes: u64,
    pub max_message_bytes: u64,
    pub priority: PriorityPolicy,
    pub trim_tie_break: TrimTieBreak,
}

impl QueueConfig {
    pub fn resolved_max_queue_bytes(&self) -> u64 {
        if self.max_queue_bytes == 0 {
            DEFAULT_MAX_QUEUE_BYTES
        } else {
            self.max_queue_bytes
        }
    }

    pub fn resolved_max_message_bytes(&self) -> u64 {
        if self.max_message_bytes == 0 {
            DEFAULT_MAX_MESSAGE_BYTES
        } else {
            self.max_message_bytes
        }
    }
}
