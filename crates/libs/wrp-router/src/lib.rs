//! # wrp-router
//!
//! The publish/subscribe WRP router (§4.2), its handler pipeline decorators
//! (§4.6-§4.8), and the QoS handler (§4.4) that sits in front of the
//! transport.
//!
//! [`Router`] owns the route table and fans normalized messages out to
//! subscribers registered by [`Router::subscribe_egress`],
//! [`Router::subscribe_event`], or [`Router::subscribe_service`]. Every
//! subscriber, and every decorator around one, implements [`Handler`].

pub mod handler;
pub mod pipeline;
pub mod qos;
pub mod route;
pub mod router;

pub use handler::{is_not_handled, Handler};
pub use pipeline::{AuthorizationHandler, LoggingHandler, MissingResponseHandler};
pub use qos::{QosConfig, QosExpiries, QosHandler};
pub use route::{Cancel, RouteKey, WILDCARD};
pub use router::{Modifier, Router, RouterConfig};
