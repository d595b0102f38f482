//! Hidden/visible classification.
//!
//! A pure function of the entity's current state, evaluated fresh on every
//! check. Hidden chats stay in the model but are excluded from the ordered
//! projection until their state changes.

use crate::types::chat::ChatData;
use crate::types::{ChatKind, MemberStatus, SecretChatState};

pub fn is_hidden(chat: &ChatData) -> bool {
    // Cover all enum values so the compiler flags any future extension.
    match chat.kind {
        ChatKind::BasicGroup | ChatKind::Supergroup => match chat.member_status {
            MemberStatus::Left | MemberStatus::Unknown | MemberStatus::Banned => true,
            MemberStatus::Creator
            | MemberStatus::Administrator
            | MemberStatus::Member
            | MemberStatus::Restricted => chat.last_message.is_none(),
        },
        ChatKind::Unknown => true,
        ChatKind::Private => chat.last_message.is_none(),
        ChatKind::Secret => chat.secret_chat_state == SecretChatState::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BackendContext, GroupState};
    use serde_json::json;

    struct NullBackend;

    impl BackendContext for NullBackend {
        fn own_user_id(&self) -> i64 {
            1
        }
        fn group(&self, _group_id: i64) -> Option<GroupState> {
            None
        }
        fn secret_chat_state(&self, _secret_chat_id: i64) -> Option<SecretChatState> {
            None
        }
    }

    fn chat(type_payload: serde_json::Value, with_message: bool) -> ChatData {
        let mut payload = json!({"id": 10, "type": type_payload});
        if with_message {
            payload["last_message"] = json!({"id": 1, "date": 100});
        }
        ChatData::from_raw(payload, &NullBackend).expect("valid payload")
    }

    #[test]
    fn test_group_hidden_when_left_banned_or_unknown() {
        for status in [
            MemberStatus::Left,
            MemberStatus::Banned,
            MemberStatus::Unknown,
        ] {
            let mut c = chat(json!({"@type": "chatTypeBasicGroup", "basic_group_id": 5}), true);
            c.member_status = status;
            assert!(is_hidden(&c), "{status:?} should hide the chat");
        }
    }

    #[test]
    fn test_group_member_hidden_until_first_message() {
        for status in [
            MemberStatus::Creator,
            MemberStatus::Administrator,
            MemberStatus::Member,
            MemberStatus::Restricted,
        ] {
            let mut empty = chat(json!({"@type": "chatTypeSupergroup", "supergroup_id": 5}), false);
            empty.member_status = status;
            assert!(is_hidden(&empty), "{status:?} without message should hide");

            let mut with_message =
                chat(json!({"@type": "chatTypeSupergroup", "supergroup_id": 5}), true);
            with_message.member_status = status;
            assert!(!is_hidden(&with_message), "{status:?} with message should show");
        }
    }

    #[test]
    fn test_unknown_kind_always_hidden() {
        assert!(is_hidden(&chat(json!({"@type": "chatTypeNew"}), true)));
    }

    #[test]
    fn test_private_hidden_until_first_message() {
        assert!(is_hidden(&chat(json!({"@type": "chatTypePrivate"}), false)));
        assert!(!is_hidden(&chat(json!({"@type": "chatTypePrivate"}), true)));
    }

    #[test]
    fn test_secret_hidden_only_when_closed() {
        let mut c = chat(json!({"@type": "chatTypeSecret", "secret_chat_id": 3}), false);
        for state in [
            SecretChatState::Unknown,
            SecretChatState::Pending,
            SecretChatState::Active,
        ] {
            c.secret_chat_state = state;
            assert!(!is_hidden(&c), "{state:?} should not hide the chat");
        }
        c.secret_chat_state = SecretChatState::Closed;
        assert!(is_hidden(&c));
    }
}
