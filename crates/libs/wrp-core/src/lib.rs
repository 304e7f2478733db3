//! # wrp-core
//!
//! The WRP message envelope, its locator grammar, and the msgpack wire codec
//! shared by every other crate in this workspace.
//!
//! This crate is the contract every other crate routes, queues, or proxies
//! without inspecting further: [`Locator`] parses the hierarchical address
//! grammar, [`Message`] is the envelope itself (with [`QosClass`] bucketing),
//! and [`codec`] turns a `Message` into bytes and back.
//!
//! ## Crate family
//!
//! - **`wrp-core`** (this crate) — envelope, locator, codec, shared errors.
//! - [`wrp-queue`] — the QoS priority queue.
//! - [`wrp-router`] — the publish/subscribe router and handler pipeline.
//! - [`wrp-parodus`] — the libparodus-compatible service adapter.

pub mod codec;
pub mod error;
pub mod locator;
pub mod message;

pub use codec::{decode, encode};
pub use error::WrpError;
pub use locator::Locator;
pub use message::{Message, MessageType, QosClass};

/// Generates a random transaction UUID, used by the router's normalization
/// step (§4.2) when an inbound message has none.
pub fn new_transaction_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
