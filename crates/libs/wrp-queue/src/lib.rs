//! # wrp-queue
//!
//! The QoS-ordered, size-bounded priority queue used to buffer outbound WRP
//! traffic ahead of the transport. See [`PriorityQueue`] for the operations
//! and [`QueueConfig`] for its configuration surface.

mod config;
mod heap;
mod item;
mod queue;

pub use config::{PriorityPolicy, QueueConfig, TrimTieBreak, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_MAX_QUEUE_BYTES};
pub use item::PriorityQueueItem;
pub use queue::PriorityQueue;
