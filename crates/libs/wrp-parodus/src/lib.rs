//! # wrp-parodus
//!
//! The libparodus-compatible adapter (§4.5): a pull-pattern listener that
//! accepts local service connections, a `name -> registration` map, and the
//! per-service keepalive task that drives registration-accepted acks and
//! periodic liveness pings.
//!
//! PUSH/PULL is reproduced over `tokio::net::UnixListener`/`UnixStream` with
//! length-prefixed msgpack framing rather than a nanomsg binding — see
//! [`adapter`] and SPEC_FULL.md §4.5.1 for the substitution rationale.

pub mod adapter;
pub mod config;
pub mod framing;
pub mod keepalive;
pub mod registration;

pub use adapter::LibparodusAdapter;
pub use config::AdapterConfig;
pub use registration::Registration;
