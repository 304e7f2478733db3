use async_trait::async_trait;
use wrp_core::{Message, WrpError};

/// A router subscriber, or a stage in the handler pipeline wrapping one.
///
/// Returning `Err(WrpError::NotHandled)` (or `NotHandledDueTo`) means "this
/// subscriber did not handle the message" — any other result, `Ok(())`
/// included, counts as handled (§4.2 step 3).
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError>;
}

/// Whether `result` represents "not handled" for the router's election (§4.2
/// step 3) — anything else, success or otherwise, is "handled".
pub fn is_not_handled(result: &Result<(), WrpError>) -> bool {
    matches!(
        result,
        Err(WrpError::NotHandled) | Err(WrpError::NotHandledDueTo { .. })
    )
}
