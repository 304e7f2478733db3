//! The publish/subscribe router (§4.2).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wrp_core::{Locator, Message, WrpError};

use crate::handler::{is_not_handled, Handler};
use crate::route::{Cancel, RouteKey, RouteTable, WILDCARD};

/// A normalization step run over every message before routing (§4.2 step 1).
/// The router always runs its five built-in steps first; `extra_modifiers`
/// run afterward, in the order supplied.
pub type Modifier = Arc<dyn Fn(&mut Message) -> Result<(), WrpError> + Send + Sync>;

/// Router configuration surface (§6).
#[derive(Clone)]
pub struct RouterConfig {
    /// The device's own identity locator (`scheme:authority`, no service).
    pub self_identity: Locator,
    /// Zero means "no timeout".
    pub publish_timeout: Duration,
    pub extra_modifiers: Vec<Modifier>,
}

impl RouterConfig {
    pub fn new(self_identity: Locator) -> Self {
        Self {
            self_identity,
            publish_timeout: Duration::ZERO,
            extra_modifiers: Vec::new(),
        }
    }
}

pub struct Router {
    config: RouterConfig,
    routes: RouteTable,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
        }
    }

    pub fn subscribe_egress(&self, handler: Arc<dyn Handler>) -> Cancel {
        self.routes.subscribe(RouteKey::Egress, handler)
    }

    /// `name` may be [`WILDCARD`]; it may not be empty or contain `/`.
    pub fn subscribe_event(&self, name: &str, handler: Arc<dyn Handler>) -> Result<Cancel, WrpError> {
        validate_route_name(name)?;
        Ok(self.routes.subscribe(RouteKey::Event(name.to_string()), handler))
    }

    /// `name` may be [`WILDCARD`]; it may not be empty or contain `/`.
    pub fn subscribe_service(&self, name: &str, handler: Arc<dyn Handler>) -> Result<Cancel, WrpError> {
        validate_route_name(name)?;
        Ok(self.routes.subscribe(RouteKey::Service(name.to_string()), handler))
    }

    /// Normalizes, routes, and fans `msg` out to subscribers (§4.2).
    pub async fn handle_wrp(&self, mut msg: Message) -> Result<(), WrpError> {
        if let Err(err) = self.normalize(&mut msg) {
            return Err(err.into_not_handled());
        }

        let destination = Locator::parse(&msg.destination).map_err(WrpError::into_not_handled)?;
        let route_keys = self.compute_routes(&destination);

        let mut subscribers = Vec::new();
        for key in &route_keys {
            subscribers.extend(self.routes.subscribers(key));
        }

        self.fan_out(msg, subscribers).await
    }

    fn normalize(&self, msg: &mut Message) -> Result<(), WrpError> {
        if !msg.message_type.is_valid() {
            return Err(WrpError::InvalidMessageType);
        }

        let source = Locator::parse(&msg.source)?;
        let destination = Locator::parse(&msg.destination)?;

        if source.is_self() {
            msg.source = source.substitute_identity(&self.config.self_identity).to_string();
        }
        if destination.is_self() {
            msg.destination = destination.substitute_identity(&self.config.self_identity).to_string();
        }

        if msg.transaction_uuid.as_deref().unwrap_or("").is_empty() {
            msg.transaction_uuid = Some(wrp_core::new_transaction_uuid());
        }

        // Every string field here is already a Rust `String`, which is a
        // UTF-8 invariant of the type itself — there is no byte-level
        // representation to reject post-decode. `WrpError::NotUtf8` remains
        // reachable at the codec boundary for callers constructing a
        // `Message` from raw bytes outside `rmp-serde`.

        for modifier in &self.config.extra_modifiers {
            modifier(msg)?;
        }

        Ok(())
    }

    fn compute_routes(&self, destination: &Locator) -> Vec<RouteKey> {
        if destination.identity_eq(&self.config.self_identity) || destination.is_self() {
            let service = destination.service.clone().unwrap_or_default();
            vec![RouteKey::Service(service), RouteKey::Service(WILDCARD.to_string())]
        } else if destination.is_event() {
            vec![
                RouteKey::Event(destination.authority.clone()),
                RouteKey::Event(WILDCARD.to_string()),
                RouteKey::Egress,
            ]
        } else {
            vec![RouteKey::Egress]
        }
    }

    /// Invokes every subscriber concurrently and races the first "handled"
    /// signal against "all finished, none handled" and the publish deadline
    /// (§4.2 step 4, §9 design note). Subscribers still in flight when the
    /// race resolves are left to finish on their own; their results are
    /// discarded.
    async fn fan_out(&self, msg: Message, subscribers: Vec<Arc<dyn Handler>>) -> Result<(), WrpError> {
        if subscribers.is_empty() {
            return Err(WrpError::NotHandled);
        }

        let (handled_tx, mut handled_rx) = tokio::sync::mpsc::channel::<()>(1);
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let done_tx = Arc::new(std::sync::Mutex::new(Some(done_tx)));
        let remaining = Arc::new(AtomicUsize::new(subscribers.len()));

        for subscriber in subscribers {
            let msg = msg.clone();
            let handled_tx = handled_tx.clone();
            let remaining = Arc::clone(&remaining);
            let done_tx = Arc::clone(&done_tx);
            tokio::spawn(async move {
                let result = subscriber.handle_wrp(msg).await;
                if !is_not_handled(&result) {
                    let _ = handled_tx.try_send(());
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    if let Some(tx) = done_tx.lock().expect("done_tx mutex poisoned").take() {
                        let _ = tx.send(());
                    }
                }
            });
        }
        drop(handled_tx);

        let deadline = self.config.publish_timeout;
        let timeout = async move {
            if deadline.is_zero() {
                std::future::pending::<()>().await;
            } else {
                tokio::time::sleep(deadline).await;
            }
        };
        tokio::pin!(timeout);
        tokio::pin!(done_rx);

        tokio::select! {
            biased;
            Some(()) = handled_rx.recv() => Ok(()),
            _ = &mut done_rx => Err(WrpError::NotHandled),
            _ = &mut timeout => Err(WrpError::Timeout),
        }
    }
}

fn validate_route_name(name: &str) -> Result<(), WrpError> {
    if name.is_empty() || name.contains('/') {
        return Err(WrpError::InvalidInput {
            message: format!("route name {name:?} must be non-empty and contain no '/'"),
        });
    }
    Ok(())
}
