//! The QoS priority queue (§4.3).

use std::time::Duration;

use wrp_core::{Message, QosClass, WrpError};

use crate::config::QueueConfig;
use crate::heap::{Heap, Mode};
use crate::item::PriorityQueueItem;

/// A max-heap of messages ordered by QoS class, size-bounded by cumulative
/// payload bytes. There is no blocking variant — callers synchronize
/// externally (the QoS handler owns one of these behind its service task).
pub struct PriorityQueue {
    heap: Heap,
    config: QueueConfig,
    total_payload_bytes: u64,
}

impl PriorityQueue {
    pub fn new(config: QueueConfig) -> Self {
        let heap = Heap::new(config.priority, config.trim_tie_break);
        Self {
            heap,
            config,
            total_payload_bytes: 0,
        }
    }

    pub fn total_payload_bytes(&self) -> u64 {
        self.total_payload_bytes
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Rejects oversize messages with [`WrpError::MaxMessageBytes`] and
    /// leaves the queue untouched; otherwise pushes and trims.
    pub fn enqueue(&mut self, message: Message) -> Result<(), WrpError> {
        if message.payload.len() as u64 > self.config.resolved_max_message_bytes() {
            return Err(WrpError::MaxMessageBytes);
        }
        let item = PriorityQueueItem::new(message);
        self.total_payload_bytes += item.payload_len() as u64;
        self.heap.push(item);
        self.trim();
        Ok(())
    }

    /// Pops the top item per the current comparator. `None` iff empty.
    pub fn dequeue(&mut self) -> Option<Message> {
        let item = self.heap.pop()?;
        self.total_payload_bytes -= item.payload_len() as u64;
        Some(item.message)
    }

    /// Drops items whose class TTL (as given by `expiry`) has elapsed since
    /// enqueue. Called by the QoS service task before each dequeue attempt —
    /// a coarse sweep, not a per-item timer (§4.4).
    pub fn sweep_expired<F>(&mut self, expiry: F)
    where
        F: Fn(QosClass) -> Duration,
    {
        let now = std::time::Instant::now();
        let mut expired_bytes = 0u64;
        self.heap.retain(|item| {
            let ttl = expiry(item.message.qos_class());
            if now.duration_since(item.enqueued_at) >= ttl {
                expired_bytes += item.payload_len() as u64;
                false
            } else {
                true
            }
        });
        self.total_payload_bytes -= expired_bytes;
    }

    /// While over budget, flips to trim mode (lowest QoS on top) and evicts
    /// until within budget or only one item remains, then flips back.
    fn trim(&mut self) {
        let max_queue_bytes = self.config.resolved_max_queue_bytes();
        if self.total_payload_bytes <= max_queue_bytes || self.heap.len() <= 1 {
            return;
        }
        self.heap.set_mode(Mode::Trimming);
        while self.total_payload_bytes > max_queue_bytes && self.heap.len() > 1 {
            match self.heap.pop() {
                Some(victim) => self.total_payload_bytes -= victim.payload_len() as u64,
                None => break,
            }
        }
        self.heap.set_mode(Mode::Normal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PriorityPolicy, TrimTieBreak};
    use wrp_core::MessageType;

    fn msg(qos: i32, payload_len: usize) -> Message {
        let mut m = Message::new(MessageType::SimpleEvent, "mac:a", "mac:b");
        m.quality_of_service = qos;
        m.payload = vec![0u8; payload_len];
        m
    }

    #[test]
    fn enqueue_dequeue_roundtrip_single_item() {
        let mut q = PriorityQueue::new(QueueConfig::default());
        q.enqueue(msg(80, 16)).expect("enqueue");
        assert_eq!(q.total_payload_bytes(), 16);
        let out = q.dequeue().expect("dequeue");
        assert_eq!(out.payload.len(), 16);
        assert_eq!(q.total_payload_bytes(), 0);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn rejects_oversize_messages_without_state_change() {
        let config = QueueConfig {
            max_message_bytes: 8,
            ..Default::default()
        };
        let mut q = PriorityQueue::new(config);
        let err = q.enqueue(msg(10, 16)).unwrap_err();
        assert!(matches!(err, WrpError::MaxMessageBytes));
        assert_eq!(q.total_payload_bytes(), 0);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn oversize_single_item_is_not_evicted_by_itself() {
        // Scenario 4 (§8): max_queue_bytes = 3 * sizeof(medium), max_message_bytes = sizeof(critical).
        let medium_size = 100;
        let critical_size = 100;
        let config = QueueConfig {
            max_queue_bytes: 3 * medium_size as u64,
            max_message_bytes: critical_size as u64,
            priority: PriorityPolicy::Newest,
            trim_tie_break: TrimTieBreak::Oldest,
        };
        let mut q = PriorityQueue::new(config);
        q.enqueue(msg(30, medium_size)).expect("medium 1");
        q.enqueue(msg(30, medium_size)).expect("medium 2");
        q.enqueue(msg(30, medium_size)).expect("medium 3");
        q.enqueue(msg(90, critical_size)).expect("critical");

        assert!(q.total_payload_bytes() <= config.resolved_max_queue_bytes() || q.len() == 1);

        let first = q.dequeue().expect("dequeue 1");
        assert_eq!(first.quality_of_service, 90, "critical goes out first");

        let second = q.dequeue().expect("dequeue 2");
        assert_eq!(second.quality_of_service, 30);
        let third = q.dequeue().expect("dequeue 3");
        assert_eq!(third.quality_of_service, 30);
        assert!(q.dequeue().is_none(), "oldest medium was trimmed away");
    }

    #[test]
    fn sweep_expired_drops_stale_items_and_updates_total_bytes() {
        let mut q = PriorityQueue::new(QueueConfig::default());
        q.enqueue(msg(10, 8)).expect("enqueue");
        std::thread::sleep(Duration::from_millis(5));
        q.sweep_expired(|_| Duration::from_millis(1));
        assert_eq!(q.len(), 0);
        assert_eq!(q.total_payload_bytes(), 0);
    }

    #[test]
    fn newest_tie_break_prefers_later_enqueued_within_same_class() {
        let config = QueueConfig {
            priority: PriorityPolicy::Newest,
            ..Default::default()
        };
        let mut q = PriorityQueue::new(config);
        let mut first = msg(50, 4);
        first.transaction_uuid = Some("first".to_string());
        let mut second = msg(50, 4);
        second.transaction_uuid = Some("second".to_string());
        q.enqueue(first).expect("enqueue first");
        q.enqueue(second).expect("enqueue second");
        let top = q.dequeue().expect("dequeue");
        assert_eq!(top.transaction_uuid.as_deref(), Some("second"));
    }
}
