//! Injected backend collaborator.
//!
//! The model never reaches for ambient global state; everything it needs
//! from the messaging backend beyond the event stream comes through this
//! trait, which keeps the model testable with a fake backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{MemberStatus, SecretChatState};

/// Cached state of a basic group or supergroup, owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub group_id: i64,
    pub member_status: MemberStatus,
    pub is_verified: bool,
}

/// Read-only view onto backend state the model consults while applying
/// update events.
pub trait BackendContext: Send + Sync {
    /// Identity of the logged-in user, used for delivery-status derivation.
    fn own_user_id(&self) -> i64;

    /// Current state of a group, if the backend knows it.
    fn group(&self, group_id: i64) -> Option<GroupState>;

    /// Current lifecycle state of a secret chat, if the backend knows it.
    fn secret_chat_state(&self, secret_chat_id: i64) -> Option<SecretChatState>;

    /// One-line preview text for a raw message payload.
    ///
    /// Rendering is a presentation concern; the default implementation only
    /// extracts plain text content, which is enough for the model's
    /// preview/filter bookkeeping.
    fn message_preview(&self, message: &Value, _is_channel: bool) -> String {
        message
            .get("content")
            .and_then(|content| content.get("text"))
            .and_then(|text| text.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}
