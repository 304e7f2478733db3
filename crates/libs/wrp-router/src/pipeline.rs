//! Composable `Handler` decorators: authorization, missing-response
//! synthesis, and logging (§4.6, §4.7, §4.8).
//!
//! Each decorator holds its `next` (and, where replies are synthesized, an
//! `egress` handler to send them through) the same way
//! `styrened-rs`'s RPC dispatcher wraps the real daemon implementation.

use async_trait::async_trait;
use serde_json::json;
use wrp_core::{Message, MessageType, WrpError};

use crate::handler::Handler;

/// Rejects messages whose `partner_ids` do not intersect an allow-list,
/// synthesizing a 403 reply when the message expected one (§4.6).
pub struct AuthorizationHandler {
    allow_list: Vec<String>,
    next: std::sync::Arc<dyn Handler>,
    egress: std::sync::Arc<dyn Handler>,
    source: String,
}

impl AuthorizationHandler {
    pub fn new(
        allow_list: Vec<String>,
        next: std::sync::Arc<dyn Handler>,
        egress: std::sync::Arc<dyn Handler>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            allow_list,
            next,
            egress,
            source: source.into(),
        }
    }

    fn is_authorized(&self, msg: &Message) -> bool {
        if self.allow_list.iter().any(|id| id == "*") {
            return true;
        }
        msg.partner_ids
            .iter()
            .map(|id| id.trim())
            .any(|id| self.allow_list.iter().any(|allowed| allowed == id))
    }
}

#[async_trait]
impl Handler for AuthorizationHandler {
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        if self.is_authorized(&msg) {
            return self.next.handle_wrp(msg).await;
        }

        if !msg.message_type.requires_response() {
            return Err(WrpError::Unauthorized);
        }

        let body = json!({ "partner_ids": msg.partner_ids }).to_string();
        let reply = Message::new(MessageType::SimpleRequestResponse, self.source.clone(), msg.source.clone())
            .with_status(403)
            .with_content_type("application/json")
            .with_payload(body.into_bytes());

        match self.egress.handle_wrp(reply).await {
            Ok(()) | Err(WrpError::NotHandled) | Err(WrpError::NotHandledDueTo { .. }) => {
                Err(WrpError::Unauthorized)
            }
            Err(egress_error) => Err(WrpError::unauthorized_reply_failed(egress_error)),
        }
    }
}

/// Synthesizes a 531 "not handled" response for request/response traffic
/// that nothing downstream claimed (§4.7).
pub struct MissingResponseHandler {
    next: std::sync::Arc<dyn Handler>,
    egress: std::sync::Arc<dyn Handler>,
    source: String,
}

impl MissingResponseHandler {
    pub fn new(next: std::sync::Arc<dyn Handler>, egress: std::sync::Arc<dyn Handler>, source: impl Into<String>) -> Self {
        Self {
            next,
            egress,
            source: source.into(),
        }
    }
}

#[async_trait]
impl Handler for MissingResponseHandler {
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        let result = self.next.handle_wrp(msg.clone()).await;
        let Err(err) = result else {
            return Ok(());
        };

        if !msg.message_type.requires_response() {
            return Err(err);
        }
        if !matches!(err, WrpError::NotHandled | WrpError::NotHandledDueTo { .. }) {
            return Err(err);
        }

        let body = json!({ "statusCode": 531 }).to_string();
        let reply = Message::new(MessageType::SimpleRequestResponse, self.source.clone(), msg.source.clone())
            .with_status(531)
            .with_content_type("application/json")
            .with_payload(body.into_bytes());

        self.egress.handle_wrp(reply).await
    }
}

/// Observability-only decorator: logs before and after delegating to `next`,
/// never altering behavior (§4.8).
pub struct LoggingHandler {
    next: std::sync::Arc<dyn Handler>,
}

impl LoggingHandler {
    pub fn new(next: std::sync::Arc<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        log::debug!(
            "wrp: source={} destination={} transaction_uuid={:?} qos={}",
            msg.source,
            msg.destination,
            msg.transaction_uuid,
            msg.quality_of_service,
        );
        let result = self.next.handle_wrp(msg).await;
        match &result {
            Ok(()) => log::debug!("wrp: handled"),
            Err(WrpError::NotHandled) | Err(WrpError::NotHandledDueTo { .. }) => {
                log::debug!("wrp: not handled")
            }
            Err(err) => log::warn!("wrp: error {err}"),
        }
        result
    }
}
