use serde::{Deserialize, Serialize};

/// Errors shared across the WRP routing plane: locator parsing, message
/// normalization, queueing, and the adapter.
///
/// `NotHandledDueTo` and `UnauthorizedReplyFailed` stand in for the joined
/// errors a Go implementation would build with `errors.Join`: Rust has no
/// multi-error primitive, so the two outcomes that actually need to carry a
/// secondary error get a dedicated variant instead.
#[derive(Debug, Serialize, Deserialize, thiserror::Error)]
#[non_exhaustive]
pub enum WrpError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("invalid locator: {input}")]
    InvalidLocator { input: String },

    #[error("invalid message type for routing")]
    InvalidMessageType,

    #[error("field {field} is not valid UTF-8")]
    NotUtf8 { field: String },

    #[error("not handled")]
    NotHandled,

    #[error("not handled: {validation}")]
    NotHandledDueTo {
        #[source]
        validation: Box<WrpError>,
    },

    #[error("publish timed out")]
    Timeout,

    #[error("shut down")]
    Shutdown,

    #[error("message exceeds max_message_bytes")]
    MaxMessageBytes,

    #[error("unauthorized")]
    Unauthorized,

    #[error("unauthorized, and reply failed: {egress_error}")]
    UnauthorizedReplyFailed {
        #[source]
        egress_error: Box<WrpError>,
    },

    #[error("no service registered with that name")]
    NoService,

    #[error("msgpack encode error: {message}")]
    Encode { message: String },

    #[error("msgpack decode error: {message}")]
    Decode { message: String },

    #[error("io error: {message}")]
    Io { message: String },
}

impl WrpError {
    /// Returns `true` for errors a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Io { .. })
    }

    /// Wraps `self` as the validation cause of a `NotHandled`, per §4.2 step 1.
    pub fn into_not_handled(self) -> Self {
        Self::NotHandledDueTo {
            validation: Box::new(self),
        }
    }

    pub fn unauthorized_reply_failed(egress_error: Self) -> Self {
        Self::UnauthorizedReplyFailed {
            egress_error: Box::new(egress_error),
        }
    }
}

impl From<rmp_serde::encode::Error> for WrpError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Encode {
            message: err.to_string(),
        }
    }
}

impl From<rmp_serde::decode::Error> for WrpError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for WrpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
