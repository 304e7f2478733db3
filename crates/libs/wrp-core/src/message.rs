//! The WRP message envelope and its QoS bucketing.

use serde::{Deserialize, Serialize};

/// WRP message type. Mirrors the XMidt wire taxonomy: events, request/response
/// traffic, the libparodus registration handshake, and the sentinel invalid
/// values that must never enter routing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MessageType {
    Invalid0,
    Invalid1,
    SimpleRequestResponse,
    SimpleEvent,
    Create,
    Retrieve,
    Update,
    Delete,
    ServiceRegistration,
    ServiceAlive,
    Unknown,
    Authorization,
}

impl MessageType {
    /// `false` for the sentinel invalid values; everything else may be routed.
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid0 | Self::Invalid1)
    }

    /// Whether a subscriber that does not reply leaves the exchange
    /// incomplete, per §4.7 — only request/response shaped traffic expects
    /// a reply.
    pub fn requires_response(self) -> bool {
        matches!(self, Self::SimpleRequestResponse | Self::Create | Self::Retrieve | Self::Update | Self::Delete)
    }
}

/// QoS class derived from the `quality_of_service` integer field.
///
/// Boundaries per §3: low `<25`, medium `25..50`, high `50..75`, critical
/// `>=75`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QosClass {
    Low,
    Medium,
    High,
    Critical,
}

impl QosClass {
    pub fn from_value(value: i32) -> Self {
        match value {
            v if v >= 75 => Self::Critical,
            v if v >= 50 => Self::High,
            v if v >= 25 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// A WRP message envelope.
///
/// `source` and `destination` are raw locator strings; callers parse them
/// with [`crate::locator::Locator::parse`] as needed — the envelope itself
/// does not force eager parsing so that messages en route to being dropped
/// for a different reason are not penalized by locator validation cost.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub source: String,
    pub destination: String,
    pub transaction_uuid: Option<String>,
    #[serde(default)]
    pub partner_ids: Vec<String>,
    #[serde(default)]
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
    pub status: Option<i32>,
    #[serde(default)]
    pub quality_of_service: i32,
    pub service_name: Option<String>,
    pub url: Option<String>,
}

impl Message {
    pub fn qos_class(&self) -> QosClass {
        QosClass::from_value(self.quality_of_service)
    }

    /// Builds a minimal message, leaving optional fields unset. Convenience
    /// for tests and for the synthesized replies in §4.6/§4.7.
    pub fn new(message_type: MessageType, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            message_type,
            source: source.into(),
            destination: destination.into(),
            transaction_uuid: None,
            partner_ids: Vec::new(),
            payload: Vec::new(),
            content_type: None,
            status: None,
            quality_of_service: 0,
            service_name: None,
            url: None,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_status(mut self, status: i32) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_class_boundaries() {
        assert_eq!(QosClass::from_value(0), QosClass::Low);
        assert_eq!(QosClass::from_value(24), QosClass::Low);
        assert_eq!(QosClass::from_value(25), QosClass::Medium);
        assert_eq!(QosClass::from_value(49), QosClass::Medium);
        assert_eq!(QosClass::from_value(50), QosClass::High);
        assert_eq!(QosClass::from_value(74), QosClass::High);
        assert_eq!(QosClass::from_value(75), QosClass::Critical);
        assert_eq!(QosClass::from_value(200), QosClass::Critical);
    }

    #[test]
    fn invalid_types_are_not_valid() {
        assert!(!MessageType::Invalid0.is_valid());
        assert!(!MessageType::Invalid1.is_valid());
        assert!(MessageType::SimpleEvent.is_valid());
    }

    #[test]
    fn only_request_response_requires_a_response() {
        assert!(MessageType::SimpleRequestResponse.requires_response());
        assert!(!MessageType::SimpleEvent.requires_response());
        assert!(!MessageType::ServiceAlive.requires_response());
    }
}
