//! Route keys and the subscriber table (§3, §4.2 edge cases).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::handler::Handler;

/// Wildcard name used for `event:*` and `service:*`.
pub const WILDCARD: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Egress,
    Event(String),
    Service(String),
}

struct Subscription {
    tombstoned: Arc<AtomicBool>,
    handler: Arc<dyn Handler>,
}

/// A cancel token for a subscription. Calling `cancel` more than once has
/// the same effect as calling it once (§8 "cancel idempotence").
#[derive(Clone)]
pub struct Cancel {
    tombstoned: Arc<AtomicBool>,
}

impl Cancel {
    pub fn cancel(&self) {
        self.tombstoned.store(true, Ordering::SeqCst);
    }
}

/// The router's route table: an append-only ordered multiset per route key,
/// with cancellation by tombstone flag rather than physical removal — the
/// list is compacted lazily on the next structural write (§9).
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<RouteKey, Vec<Subscription>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`, preserving registration order. The
    /// same (key, handler) pair may be registered more than once; each
    /// registration gets its own independent cancel.
    pub fn subscribe(&self, key: RouteKey, handler: Arc<dyn Handler>) -> Cancel {
        let tombstoned = Arc::new(AtomicBool::new(false));
        let subscription = Subscription {
            tombstoned: Arc::clone(&tombstoned),
            handler,
        };
        let mut routes = self.routes.write().expect("route table lock poisoned");
        let list = routes.entry(key).or_default();
        list.retain(|s| !s.tombstoned.load(Ordering::SeqCst));
        list.push(subscription);
        Cancel { tombstoned }
    }

    /// Returns the live (non-tombstoned) handlers registered under `key`, in
    /// registration order.
    pub fn subscribers(&self, key: &RouteKey) -> Vec<Arc<dyn Handler>> {
        let routes = self.routes.read().expect("route table lock poisoned");
        routes
            .get(key)
            .map(|list| {
                list.iter()
                    .filter(|s| !s.tombstoned.load(Ordering::SeqCst))
                    .map(|s| Arc::clone(&s.handler))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use async_trait::async_trait;
    use wrp_core::{Message, WrpError};

    struct NoopHandler;

    #[async_trait]
    impl Handler for NoopHandler {
        async fn handle_wrp(&self, _msg: Message) -> Result<(), WrpError> {
            Ok(())
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let table = RouteTable::new();
        let cancel = table.subscribe(RouteKey::Egress, Arc::new(NoopHandler));
        assert_eq!(table.subscribers(&RouteKey::Egress).len(), 1);
        cancel.cancel();
        cancel.cancel();
        assert_eq!(table.subscribers(&RouteKey::Egress).len(), 0);
    }

    #[test]
    fn same_route_and_handler_cancel_independently() {
        let table = RouteTable::new();
        let handler = Arc::new(NoopHandler);
        let first = table.subscribe(RouteKey::Egress, Arc::clone(&handler) as Arc<dyn Handler>);
        let _second = table.subscribe(RouteKey::Egress, handler as Arc<dyn Handler>);
        assert_eq!(table.subscribers(&RouteKey::Egress).len(), 2);
        first.cancel();
        assert_eq!(table.subscribers(&RouteKey::Egress).len(), 1);
    }
}
