//! The chat entity: a typed record for every field the ordering, visibility
//! and notification logic inspects, plus an overflow map for passthrough
//! payloads the model never looks into (photo, notification settings,
//! available reactions, raw message payloads).

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::context::{BackendContext, GroupState};
use crate::error::PayloadError;
use crate::types::{ChatId, ChatKind, ChatRole, MemberStatus, MessageStatus, SecretChatState};
use crate::visibility;

/// Interpret a payload value as a 64-bit integer. Backends ship large ids
/// and order keys both as numbers and as decimal strings.
pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn type_tag(value: &Value) -> &str {
    value.get("@type").and_then(Value::as_str).unwrap_or_default()
}

/// Send state a message payload can carry while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendState {
    Pending,
    Failed,
}

/// Typed snapshot of a chat's last message, extracted from the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    pub id: i64,
    pub sender_user_id: i64,
    pub sender_chat_id: i64,
    pub date: i64,
    pub send_state: Option<SendState>,
}

impl MessageSnapshot {
    fn from_value(message: &Value) -> Option<Self> {
        let message = match message {
            Value::Object(map) => map,
            _ => return None,
        };
        let sender = message.get("sender_id");
        let sender_field = |key: &str| {
            sender
                .and_then(|s| s.get(key))
                .and_then(as_i64)
                .unwrap_or_default()
        };
        let send_state = message.get("sending_state").map(|state| {
            if type_tag(state) == "messageSendingStatePending" {
                SendState::Pending
            } else {
                SendState::Failed
            }
        });
        Some(Self {
            id: message.get("id").and_then(as_i64).unwrap_or_default(),
            sender_user_id: sender_field("user_id"),
            sender_chat_id: sender_field("chat_id"),
            date: message.get("date").and_then(as_i64).unwrap_or_default(),
            send_state,
        })
    }
}

/// Typed snapshot of a chat's draft message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSnapshot {
    pub date: i64,
    pub text: String,
}

impl DraftSnapshot {
    fn from_value(draft: &Value) -> Option<Self> {
        let draft = draft.as_object()?;
        if draft.is_empty() {
            return None;
        }
        let text = draft
            .get("input_message_text")
            .and_then(|m| m.get("text"))
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self {
            date: draft.get("date").and_then(as_i64).unwrap_or_default(),
            text,
        })
    }
}

/// One chat record tracked by the model.
///
/// Mutated in place by update events; never replaced except through an
/// explicit deep [`Clone`] used for snapshotting.
#[derive(Debug, Clone)]
pub struct ChatData {
    pub chat_id: ChatId,
    pub order: i64,
    pub kind: ChatKind,
    pub is_channel: bool,
    pub group_id: i64,
    pub secret_chat_id: i64,
    pub title: String,
    pub unread_count: i32,
    pub unread_mention_count: i32,
    pub unread_reaction_count: i32,
    pub last_read_inbox_message_id: i64,
    pub last_read_outbox_message_id: i64,
    pub pinned_message_id: i64,
    pub is_pinned: bool,
    pub is_marked_as_unread: bool,
    pub verified: bool,
    pub member_status: MemberStatus,
    pub secret_chat_state: SecretChatState,
    pub last_message: Option<MessageSnapshot>,
    preview_text: String,
    pub draft: Option<DraftSnapshot>,
    /// Passthrough fields the model never inspects, forwarded verbatim in
    /// the raw-state projection.
    extra: Map<String, Value>,
}

impl ChatData {
    /// Build an entity from the raw discovery payload.
    ///
    /// A missing or non-numeric id is an error (the dispatcher drops the
    /// event); a missing order key defaults to the lowest priority, 0.
    pub fn from_raw(raw: Value, ctx: &dyn BackendContext) -> Result<Self, PayloadError> {
        let mut map = match raw {
            Value::Object(map) => map,
            _ => return Err(PayloadError::NotAnObject),
        };
        let chat_id = map
            .get("id")
            .and_then(as_i64)
            .ok_or(PayloadError::MissingChatId)?;
        let order = map.get("order").and_then(as_i64).unwrap_or_default();

        let mut kind = ChatKind::Unknown;
        let mut is_channel = false;
        let mut group_id = 0;
        let mut secret_chat_id = 0;
        if let Some(chat_type) = map.get("type") {
            kind = ChatKind::from_tag(type_tag(chat_type));
            is_channel = chat_type
                .get("is_channel")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let secondary = |key: &str| chat_type.get(key).and_then(as_i64).unwrap_or_default();
            match kind {
                ChatKind::BasicGroup => group_id = secondary("basic_group_id"),
                ChatKind::Supergroup => group_id = secondary("supergroup_id"),
                ChatKind::Secret => secret_chat_id = secondary("secret_chat_id"),
                ChatKind::Unknown | ChatKind::Private => {}
            }
        }

        let take_i64 = |map: &mut Map<String, Value>, key: &str| {
            map.remove(key).as_ref().and_then(as_i64).unwrap_or_default()
        };
        let take_bool = |map: &mut Map<String, Value>, key: &str| {
            map.remove(key)
                .as_ref()
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        map.remove("id");
        map.remove("order");
        let title = match map.remove("title") {
            Some(Value::String(title)) => title,
            _ => String::new(),
        };
        let unread_count = take_i64(&mut map, "unread_count") as i32;
        let unread_mention_count = take_i64(&mut map, "unread_mention_count") as i32;
        let unread_reaction_count = take_i64(&mut map, "unread_reaction_count") as i32;
        let last_read_inbox_message_id = take_i64(&mut map, "last_read_inbox_message_id");
        let last_read_outbox_message_id = take_i64(&mut map, "last_read_outbox_message_id");
        let pinned_message_id = take_i64(&mut map, "pinned_message_id");
        let is_pinned = take_bool(&mut map, "is_pinned");
        let is_marked_as_unread = take_bool(&mut map, "is_marked_as_unread");

        let last_message = map
            .get("last_message")
            .and_then(MessageSnapshot::from_value);
        let preview_text = match (&last_message, map.get("last_message")) {
            (Some(_), Some(raw_message)) => ctx.message_preview(raw_message, is_channel),
            _ => String::new(),
        };
        let draft = map.get("draft_message").and_then(DraftSnapshot::from_value);

        Ok(Self {
            chat_id,
            order,
            kind,
            is_channel,
            group_id,
            secret_chat_id,
            title,
            unread_count,
            unread_mention_count,
            unread_reaction_count,
            last_read_inbox_message_id,
            last_read_outbox_message_id,
            pinned_message_id,
            is_pinned,
            is_marked_as_unread,
            verified: false,
            member_status: MemberStatus::Unknown,
            secret_chat_state: SecretChatState::Unknown,
            last_message,
            preview_text,
            draft,
            extra: map,
        })
    }

    /// Strict total order: most recently active first, ties broken by
    /// identity with the higher id sorting first. Never returns `Equal`
    /// because ids are unique.
    pub fn sort_cmp(&self, other: &ChatData) -> Ordering {
        if self.order == other.order {
            other.chat_id.cmp(&self.chat_id)
        } else {
            other.order.cmp(&self.order)
        }
    }

    /// Apply a new order key. Empty or unparseable keys leave the previous
    /// key untouched. Returns whether the value actually changed.
    pub fn set_order(&mut self, order: &str) -> bool {
        match order.parse::<i64>() {
            Ok(value) if value != self.order => {
                self.order = value;
                true
            }
            _ => false,
        }
    }

    /// Replace the last message, recomputing every derived attribute, and
    /// report exactly the roles whose value changed. `Display` is always
    /// reported because the raw state it projects was replaced.
    pub fn apply_last_message(&mut self, message: Value, ctx: &dyn BackendContext) -> Vec<ChatRole> {
        let own_user_id = ctx.own_user_id();
        let prev_sender = self.last_message.as_ref().map(|m| m.sender_user_id);
        let prev_date = self.last_message.as_ref().map(|m| m.date);
        let prev_status = self.message_status(own_user_id);

        self.last_message = MessageSnapshot::from_value(&message);
        let preview = match &self.last_message {
            Some(_) => ctx.message_preview(&message, self.is_channel),
            None => String::new(),
        };
        self.extra.insert("last_message".to_string(), message);

        let mut changed = vec![ChatRole::Display];
        if prev_sender != self.last_message.as_ref().map(|m| m.sender_user_id) {
            changed.push(ChatRole::LastMessageSenderId);
        }
        if prev_date != self.last_message.as_ref().map(|m| m.date) {
            changed.push(ChatRole::LastMessageDate);
        }
        if preview != self.preview_text {
            self.preview_text = preview;
            changed.push(ChatRole::Filter);
            changed.push(ChatRole::LastMessageText);
        }
        if prev_status != self.message_status(own_user_id) {
            changed.push(ChatRole::LastMessageStatus);
        }
        changed
    }

    pub fn apply_unread_count(&mut self, unread_count: i32) -> bool {
        let changed = self.unread_count != unread_count;
        self.unread_count = unread_count;
        changed
    }

    pub fn apply_last_read_inbox(&mut self, message_id: i64) -> bool {
        let changed = self.last_read_inbox_message_id != message_id;
        self.last_read_inbox_message_id = message_id;
        changed
    }

    /// Take over membership status and verification flag from the group the
    /// entity references. A mismatched group id is ignored.
    pub fn apply_group(&mut self, group: &GroupState) -> Vec<ChatRole> {
        let mut changed = Vec::new();
        if self.group_id == 0 || self.group_id != group.group_id {
            return changed;
        }
        if self.member_status != group.member_status {
            self.member_status = group.member_status;
            changed.push(ChatRole::ChatMemberStatus);
        }
        if self.verified != group.is_verified {
            self.verified = group.is_verified;
            changed.push(ChatRole::IsVerified);
        }
        changed
    }

    pub fn apply_secret_chat_state(&mut self, state: SecretChatState) -> Vec<ChatRole> {
        if self.secret_chat_state != state {
            self.secret_chat_state = state;
            vec![ChatRole::SecretChatState]
        } else {
            Vec::new()
        }
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn set_photo(&mut self, photo: Value) {
        self.extra.insert("photo".to_string(), photo);
    }

    pub fn set_pinned_message(&mut self, message_id: i64) {
        self.pinned_message_id = message_id;
    }

    pub fn set_notification_settings(&mut self, settings: Value) {
        self.extra.insert("notification_settings".to_string(), settings);
    }

    pub fn set_last_read_outbox(&mut self, message_id: i64) {
        self.last_read_outbox_message_id = message_id;
    }

    pub fn set_pinned(&mut self, is_pinned: bool) {
        self.is_pinned = is_pinned;
    }

    pub fn set_marked_as_unread(&mut self, is_marked_as_unread: bool) {
        self.is_marked_as_unread = is_marked_as_unread;
    }

    pub fn set_draft(&mut self, draft: Value) {
        self.draft = DraftSnapshot::from_value(&draft);
        self.extra.insert("draft_message".to_string(), draft);
    }

    pub fn set_unread_mention_count(&mut self, count: i32) {
        self.unread_mention_count = count;
    }

    pub fn set_unread_reaction_count(&mut self, count: i32) {
        self.unread_reaction_count = count;
    }

    pub fn set_available_reactions(&mut self, reactions: Value) {
        self.extra.insert("available_reactions".to_string(), reactions);
    }

    /// Delivery status of the last message, from the own user's view.
    pub fn message_status(&self, own_user_id: i64) -> MessageStatus {
        let Some(message) = &self.last_message else {
            return MessageStatus::None;
        };
        if self.is_channel || message.sender_user_id != own_user_id || own_user_id == self.chat_id {
            return MessageStatus::None;
        }
        if message.id == self.last_read_outbox_message_id {
            return MessageStatus::Read;
        }
        match message.send_state {
            Some(SendState::Pending) => MessageStatus::Pending,
            Some(SendState::Failed) => MessageStatus::Failed,
            None => MessageStatus::Sent,
        }
    }

    pub fn preview_text(&self) -> &str {
        &self.preview_text
    }

    /// Concatenation of title and preview used for substring filtering.
    pub fn filter_text(&self) -> String {
        format!("{} {}", self.title, self.preview_text)
    }

    pub fn is_hidden(&self) -> bool {
        visibility::is_hidden(self)
    }

    /// Full raw state: the passthrough bag with the typed fields written
    /// back in, shaped like the original discovery payload.
    pub fn raw_state(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("id".to_string(), json!(self.chat_id));
        map.insert("order".to_string(), json!(self.order.to_string()));
        map.insert("title".to_string(), json!(self.title));
        map.insert("unread_count".to_string(), json!(self.unread_count));
        map.insert(
            "unread_mention_count".to_string(),
            json!(self.unread_mention_count),
        );
        map.insert(
            "unread_reaction_count".to_string(),
            json!(self.unread_reaction_count),
        );
        map.insert(
            "last_read_inbox_message_id".to_string(),
            json!(self.last_read_inbox_message_id),
        );
        map.insert(
            "last_read_outbox_message_id".to_string(),
            json!(self.last_read_outbox_message_id),
        );
        map.insert("pinned_message_id".to_string(), json!(self.pinned_message_id));
        map.insert("is_pinned".to_string(), json!(self.is_pinned));
        map.insert(
            "is_marked_as_unread".to_string(),
            json!(self.is_marked_as_unread),
        );
        Value::Object(map)
    }

    /// Project a single role's value, for attribute snapshots.
    pub fn role_value(&self, role: ChatRole, own_user_id: i64) -> Value {
        match role {
            ChatRole::Display => self.raw_state(),
            ChatRole::ChatId => json!(self.chat_id),
            ChatRole::ChatType => to_value_or_null(&self.kind),
            ChatRole::GroupId => json!(self.group_id),
            ChatRole::Title => json!(self.title),
            ChatRole::PhotoSmall => self
                .extra
                .get("photo")
                .and_then(|photo| photo.get("small"))
                .cloned()
                .unwrap_or(Value::Null),
            ChatRole::UnreadCount => json!(self.unread_count),
            ChatRole::UnreadMentionCount => json!(self.unread_mention_count),
            ChatRole::UnreadReactionCount => json!(self.unread_reaction_count),
            ChatRole::AvailableReactions => self
                .extra
                .get("available_reactions")
                .cloned()
                .unwrap_or(Value::Null),
            ChatRole::LastReadInboxMessageId => json!(self.last_read_inbox_message_id),
            ChatRole::LastMessageSenderId => {
                json!(self.last_message.as_ref().map(|m| m.sender_user_id).unwrap_or_default())
            }
            ChatRole::LastMessageDate => {
                json!(self.last_message.as_ref().map(|m| m.date).unwrap_or_default())
            }
            ChatRole::LastMessageText => json!(self.preview_text),
            ChatRole::LastMessageStatus => json!(self.message_status(own_user_id).glyph()),
            ChatRole::ChatMemberStatus => to_value_or_null(&self.member_status),
            ChatRole::SecretChatState => to_value_or_null(&self.secret_chat_state),
            ChatRole::IsVerified => json!(self.verified),
            ChatRole::IsChannel => json!(self.is_channel),
            ChatRole::IsMarkedAsUnread => json!(self.is_marked_as_unread),
            ChatRole::IsPinned => json!(self.is_pinned),
            ChatRole::Filter => json!(self.filter_text()),
            ChatRole::DraftMessageText => {
                json!(self.draft.as_ref().map(|d| d.text.clone()).unwrap_or_default())
            }
            ChatRole::DraftMessageDate => {
                json!(self.draft.as_ref().map(|d| d.date).unwrap_or_default())
            }
            // Filled in by the model, which owns the folder projection.
            ChatRole::ChatFolders | ChatRole::MainFolderPosition => Value::Null,
        }
    }
}

fn to_value_or_null<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NullBackend;

    impl BackendContext for NullBackend {
        fn own_user_id(&self) -> i64 {
            7
        }
        fn group(&self, _group_id: i64) -> Option<GroupState> {
            None
        }
        fn secret_chat_state(&self, _secret_chat_id: i64) -> Option<SecretChatState> {
            None
        }
    }

    fn private_chat(chat_id: i64, order: i64) -> ChatData {
        ChatData::from_raw(
            json!({
                "id": chat_id,
                "order": order.to_string(),
                "title": format!("Chat {chat_id}"),
                "type": {"@type": "chatTypePrivate", "user_id": chat_id},
            }),
            &NullBackend,
        )
        .expect("valid payload")
    }

    fn message(id: i64, sender_user_id: i64) -> Value {
        json!({
            "id": id,
            "date": 1000 + id,
            "sender_id": {"@type": "messageSenderUser", "user_id": sender_user_id},
            "content": {"@type": "messageText", "text": {"text": format!("hello {id}")}},
        })
    }

    #[test]
    fn test_construct_parses_kind_and_secondary_id() {
        let chat = ChatData::from_raw(
            json!({
                "id": "42",
                "order": "99",
                "type": {"@type": "chatTypeSupergroup", "supergroup_id": 1234, "is_channel": true},
            }),
            &NullBackend,
        )
        .expect("valid payload");
        assert_eq!(chat.chat_id, 42);
        assert_eq!(chat.order, 99);
        assert_eq!(chat.kind, ChatKind::Supergroup);
        assert_eq!(chat.group_id, 1234);
        assert!(chat.is_channel);
    }

    #[test]
    fn test_construct_without_id_fails() {
        let err = ChatData::from_raw(json!({"order": "1"}), &NullBackend).unwrap_err();
        assert!(matches!(err, PayloadError::MissingChatId));
    }

    #[test]
    fn test_construct_without_order_defaults_to_zero() {
        let chat = ChatData::from_raw(json!({"id": 5}), &NullBackend).expect("valid payload");
        assert_eq!(chat.order, 0);
    }

    #[test]
    fn test_set_order_rejects_empty_and_garbage() {
        let mut chat = private_chat(1, 10);
        assert!(!chat.set_order(""));
        assert!(!chat.set_order("not a number"));
        assert_eq!(chat.order, 10);
        assert!(chat.set_order("11"));
        assert!(!chat.set_order("11"));
        assert_eq!(chat.order, 11);
    }

    #[test]
    fn test_sort_cmp_orders_by_recency() {
        let newer = private_chat(1, 200);
        let older = private_chat(2, 100);
        assert_eq!(newer.sort_cmp(&older), Ordering::Less);
        assert_eq!(older.sort_cmp(&newer), Ordering::Greater);
    }

    #[test]
    fn test_sort_cmp_tie_break_prefers_higher_id() {
        let low = private_chat(100, 50);
        let high = private_chat(200, 50);
        assert_eq!(high.sort_cmp(&low), Ordering::Less);
        assert_eq!(low.sort_cmp(&high), Ordering::Greater);
    }

    #[test]
    fn test_apply_last_message_reports_changed_roles() {
        let mut chat = private_chat(1, 10);
        let changed = chat.apply_last_message(message(1, 3), &NullBackend);
        assert!(changed.contains(&ChatRole::Display));
        assert!(changed.contains(&ChatRole::LastMessageSenderId));
        assert!(changed.contains(&ChatRole::LastMessageDate));
        assert!(changed.contains(&ChatRole::LastMessageText));
        assert!(changed.contains(&ChatRole::Filter));

        // Same sender, same text, new id/date.
        let mut next = message(2, 3);
        next["content"]["text"]["text"] = json!("hello 1");
        let changed = chat.apply_last_message(next, &NullBackend);
        assert!(changed.contains(&ChatRole::Display));
        assert!(changed.contains(&ChatRole::LastMessageDate));
        assert!(!changed.contains(&ChatRole::LastMessageSenderId));
        assert!(!changed.contains(&ChatRole::LastMessageText));
    }

    #[test]
    fn test_status_read_when_outbox_caught_up() {
        let mut chat = private_chat(1, 10);
        chat.apply_last_message(message(42, 7), &NullBackend);
        chat.set_last_read_outbox(42);
        assert_eq!(chat.message_status(7), MessageStatus::Read);
    }

    #[test]
    fn test_status_pending_and_failed() {
        let mut chat = private_chat(1, 10);
        let mut pending = message(42, 7);
        pending["sending_state"] = json!({"@type": "messageSendingStatePending"});
        chat.apply_last_message(pending, &NullBackend);
        assert_eq!(chat.message_status(7), MessageStatus::Pending);

        let mut failed = message(43, 7);
        failed["sending_state"] = json!({"@type": "messageSendingStateFailed"});
        chat.apply_last_message(failed, &NullBackend);
        assert_eq!(chat.message_status(7), MessageStatus::Failed);
    }

    #[test]
    fn test_status_sent_without_send_state() {
        let mut chat = private_chat(1, 10);
        chat.apply_last_message(message(42, 7), &NullBackend);
        assert_eq!(chat.message_status(7), MessageStatus::Sent);
    }

    #[test]
    fn test_status_empty_for_channels_and_foreign_senders() {
        let mut channel = ChatData::from_raw(
            json!({
                "id": 1,
                "type": {"@type": "chatTypeSupergroup", "supergroup_id": 9, "is_channel": true},
            }),
            &NullBackend,
        )
        .expect("valid payload");
        channel.apply_last_message(message(42, 7), &NullBackend);
        assert_eq!(channel.message_status(7), MessageStatus::None);

        let mut chat = private_chat(1, 10);
        chat.apply_last_message(message(42, 3), &NullBackend);
        assert_eq!(chat.message_status(7), MessageStatus::None);
    }

    #[test]
    fn test_status_empty_for_self_chat() {
        let mut chat = private_chat(7, 10);
        chat.apply_last_message(message(42, 7), &NullBackend);
        assert_eq!(chat.message_status(7), MessageStatus::None);
    }

    #[test]
    fn test_apply_group_requires_matching_id() {
        let mut chat = ChatData::from_raw(
            json!({
                "id": 1,
                "type": {"@type": "chatTypeBasicGroup", "basic_group_id": 55},
            }),
            &NullBackend,
        )
        .expect("valid payload");
        let other = GroupState {
            group_id: 56,
            member_status: MemberStatus::Member,
            is_verified: true,
        };
        assert!(chat.apply_group(&other).is_empty());
        assert_eq!(chat.member_status, MemberStatus::Unknown);

        let own = GroupState {
            group_id: 55,
            member_status: MemberStatus::Member,
            is_verified: true,
        };
        let changed = chat.apply_group(&own);
        assert!(changed.contains(&ChatRole::ChatMemberStatus));
        assert!(changed.contains(&ChatRole::IsVerified));
        assert!(chat.apply_group(&own).is_empty());
    }

    #[test]
    fn test_clone_is_a_deep_copy() {
        let mut chat = private_chat(1, 10);
        chat.set_photo(json!({"small": {"path": "a.jpg"}}));
        let copy = chat.clone();
        chat.set_photo(json!({"small": {"path": "b.jpg"}}));
        assert_eq!(
            copy.role_value(ChatRole::PhotoSmall, 7)["path"],
            json!("a.jpg")
        );
    }

    #[test]
    fn test_raw_state_round_trips_typed_fields() {
        let mut chat = private_chat(1, 10);
        chat.apply_unread_count(4);
        let state = chat.raw_state();
        assert_eq!(state["id"], json!(1));
        assert_eq!(state["order"], json!("10"));
        assert_eq!(state["unread_count"], json!(4));
        assert_eq!(state["title"], json!("Chat 1"));
    }
}
