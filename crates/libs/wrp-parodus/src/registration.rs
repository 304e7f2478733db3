//! Per-service registration: owns the dialed push socket, the router
//! subscription, and exposes `cancel` for the keepalive task and adapter
//! shutdown to tear both down idempotently (§3, §4.5).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use wrp_core::{Message, MessageType, WrpError};
use wrp_router::{Cancel as RouteCancel, Handler};

use crate::framing;

/// `{service_name, push_socket, cancel, heartbeat_interval}` (§3). The push
/// socket is guarded by its own async mutex so keepalive pings and forwarded
/// traffic never interleave on the wire (§5).
pub struct Registration {
    pub service_name: String,
    push_socket: AsyncMutex<OwnedWriteHalf>,
    send_timeout: Duration,
    pub heartbeat_interval: Duration,
    cancel: CancellationToken,
    route_cancel: AsyncMutex<Option<RouteCancel>>,
}

impl Registration {
    pub fn new(
        service_name: String,
        push_socket: OwnedWriteHalf,
        send_timeout: Duration,
        heartbeat_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            service_name,
            push_socket: AsyncMutex::new(push_socket),
            send_timeout,
            heartbeat_interval,
            cancel: CancellationToken::new(),
            route_cancel: AsyncMutex::new(None),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Attaches the router subscription cancel once `subscribe_service` has
    /// returned, so a later [`Registration::cancel`] unsubscribes too.
    pub async fn attach_route_cancel(&self, route_cancel: RouteCancel) {
        *self.route_cancel.lock().await = Some(route_cancel);
    }

    /// Idempotent: cancels the router subscription and signals the
    /// keepalive task to stop. The push socket closes when the last `Arc`
    /// reference to this registration is dropped.
    pub async fn cancel(&self) {
        self.cancel.cancel();
        if let Some(route_cancel) = self.route_cancel.lock().await.take() {
            route_cancel.cancel();
        }
    }

    pub async fn send(&self, msg: &Message) -> Result<(), WrpError> {
        let mut socket = self.push_socket.lock().await;
        match tokio::time::timeout(self.send_timeout, framing::write_message(&mut socket, msg)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(WrpError::Io {
                message: format!("send to {} timed out", self.service_name),
            }),
        }
    }
}

#[async_trait]
impl Handler for Registration {
    /// Delivers agent→service traffic: forwards the message over the push
    /// socket (§4.2's route-set computation sends `service:<name>`/
    /// `service:*` subscribers here).
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        self.send(&msg).await
    }
}

/// Outbound registration-accepted ack, sent once on dial (§4.5, §6).
pub fn authorization_accepted_ack(service_name: &str) -> Message {
    Message::new(MessageType::Authorization, "self:/parodus", format!("self:/{service_name}")).with_status(200)
}

/// Outbound periodic liveness ping (§4.5).
pub fn service_alive_ping(service_name: &str) -> Message {
    Message::new(MessageType::ServiceAlive, "self:/parodus", format!("self:/{service_name}"))
}
