//! Update events consumed from the backend and change notifications
//! emitted to observers.

use serde_json::Value;

use crate::types::{ChatId, ChatRole, SecretChatState};

/// Typed update events arriving serialized from the backend's notification
/// channel. Raw payloads (`Value`) are passed through to the entity; the
/// model only inspects the fields it routes on.
#[derive(Debug, Clone)]
pub enum ChatUpdate {
    /// A chat the backend reports for the first time; `chat` is the full
    /// raw state.
    Discovered { chat: Value },
    LastMessage {
        chat_id: ChatId,
        order: String,
        message: Value,
    },
    Order { chat_id: ChatId, order: String },
    ReadInbox {
        chat_id: ChatId,
        last_read_inbox_message_id: i64,
        unread_count: i32,
    },
    ReadOutbox {
        chat_id: ChatId,
        last_read_outbox_message_id: i64,
    },
    Photo { chat_id: ChatId, photo: Value },
    PinnedMessage {
        chat_id: ChatId,
        pinned_message_id: i64,
    },
    /// An own outgoing message got its final id; the chat id lives inside
    /// the message payload.
    MessageSendSucceeded {
        message_id: i64,
        old_message_id: i64,
        message: Value,
    },
    NotificationSettings { chat_id: ChatId, settings: Value },
    GroupUpdated { group_id: i64 },
    SecretChat {
        secret_chat_id: i64,
        state: SecretChatState,
    },
    Title { chat_id: ChatId, title: String },
    Pinned { chat_id: ChatId, is_pinned: bool },
    MarkedAsUnread {
        chat_id: ChatId,
        is_marked_as_unread: bool,
    },
    Draft {
        chat_id: ChatId,
        draft: Value,
        order: String,
    },
    UnreadMentionCount { chat_id: ChatId, count: i32 },
    UnreadReactionCount { chat_id: ChatId, count: i32 },
    AvailableReactions { chat_id: ChatId, reactions: Value },
    Folders {
        folders: Vec<Value>,
        main_position: i64,
    },
    FolderInfo { info: Value },
}

/// Minimal change notifications, emitted only once the model is
/// structurally consistent again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    Inserted { at: usize },
    Removed { at: usize },
    /// `to` uses insert-after semantics when the chat moved toward the end
    /// of the list: it is one past the target position, counted while the
    /// chat still occupied `from`.
    Moved { from: usize, to: usize },
    /// An empty `roles` set means any role may have changed.
    Changed { at: usize, roles: Vec<ChatRole> },
    RangeChanged {
        first: usize,
        last: usize,
        roles: Vec<ChatRole>,
    },
    Reset,
    UnreadState {
        unread_messages: i32,
        unread_chats: i32,
    },
    FoldersChanged,
    ShowAllChanged { show_all: bool },
}
