//! Core types shared across the chat list model.

pub mod chat;
pub mod events;

use serde::{Deserialize, Serialize};

/// Unique chat identifier, stable across the visible and hidden populations.
pub type ChatId = i64;

/// Kind of chat, extracted from the discriminated `type` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Unknown,
    Private,
    BasicGroup,
    Supergroup,
    Secret,
}

impl ChatKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "chatTypePrivate" => ChatKind::Private,
            "chatTypeBasicGroup" => ChatKind::BasicGroup,
            "chatTypeSupergroup" => ChatKind::Supergroup,
            "chatTypeSecret" => ChatKind::Secret,
            _ => ChatKind::Unknown,
        }
    }
}

/// Membership status of the own user in a basic group or supergroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Unknown,
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "chatMemberStatusCreator" => MemberStatus::Creator,
            "chatMemberStatusAdministrator" => MemberStatus::Administrator,
            "chatMemberStatusMember" => MemberStatus::Member,
            "chatMemberStatusRestricted" => MemberStatus::Restricted,
            "chatMemberStatusLeft" => MemberStatus::Left,
            "chatMemberStatusBanned" => MemberStatus::Banned,
            _ => MemberStatus::Unknown,
        }
    }
}

/// Lifecycle state of a secret chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretChatState {
    Unknown,
    Pending,
    Active,
    Closed,
}

impl SecretChatState {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "secretChatStatePending" => SecretChatState::Pending,
            "secretChatStateReady" => SecretChatState::Active,
            "secretChatStateClosed" => SecretChatState::Closed,
            _ => SecretChatState::Unknown,
        }
    }
}

/// Delivery status of the last message, as shown next to the preview.
///
/// Only meaningful for messages the own user sent to a chat that is neither
/// a channel nor the self chat; everything else is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    None,
    Read,
    Pending,
    Failed,
    Sent,
}

impl MessageStatus {
    /// Glyph appended to the message preview.
    pub fn glyph(&self) -> &'static str {
        match self {
            MessageStatus::None => "",
            MessageStatus::Read => "\u{2705}",
            MessageStatus::Pending => "\u{1f559}",
            MessageStatus::Failed => "\u{274c}",
            MessageStatus::Sent => "\u{2611}\u{fe0f}",
        }
    }
}

/// Named attributes observers can subscribe to.
///
/// Change notifications carry the subset of roles whose value actually
/// changed; an empty subset means any role may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    Display,
    ChatId,
    ChatType,
    GroupId,
    Title,
    PhotoSmall,
    UnreadCount,
    UnreadMentionCount,
    UnreadReactionCount,
    AvailableReactions,
    LastReadInboxMessageId,
    LastMessageSenderId,
    LastMessageDate,
    LastMessageText,
    LastMessageStatus,
    ChatMemberStatus,
    SecretChatState,
    IsVerified,
    IsChannel,
    IsMarkedAsUnread,
    IsPinned,
    Filter,
    DraftMessageText,
    DraftMessageDate,
    ChatFolders,
    MainFolderPosition,
}

impl ChatRole {
    pub const ALL: [ChatRole; 26] = [
        ChatRole::Display,
        ChatRole::ChatId,
        ChatRole::ChatType,
        ChatRole::GroupId,
        ChatRole::Title,
        ChatRole::PhotoSmall,
        ChatRole::UnreadCount,
        ChatRole::UnreadMentionCount,
        ChatRole::UnreadReactionCount,
        ChatRole::AvailableReactions,
        ChatRole::LastReadInboxMessageId,
        ChatRole::LastMessageSenderId,
        ChatRole::LastMessageDate,
        ChatRole::LastMessageText,
        ChatRole::LastMessageStatus,
        ChatRole::ChatMemberStatus,
        ChatRole::SecretChatState,
        ChatRole::IsVerified,
        ChatRole::IsChannel,
        ChatRole::IsMarkedAsUnread,
        ChatRole::IsPinned,
        ChatRole::Filter,
        ChatRole::DraftMessageText,
        ChatRole::DraftMessageDate,
        ChatRole::ChatFolders,
        ChatRole::MainFolderPosition,
    ];

    /// Stable name under which the role appears in attribute snapshots.
    pub fn name(&self) -> &'static str {
        match self {
            ChatRole::Display => "display",
            ChatRole::ChatId => "chat_id",
            ChatRole::ChatType => "chat_type",
            ChatRole::GroupId => "group_id",
            ChatRole::Title => "title",
            ChatRole::PhotoSmall => "photo_small",
            ChatRole::UnreadCount => "unread_count",
            ChatRole::UnreadMentionCount => "unread_mention_count",
            ChatRole::UnreadReactionCount => "unread_reaction_count",
            ChatRole::AvailableReactions => "available_reactions",
            ChatRole::LastReadInboxMessageId => "last_read_inbox_message_id",
            ChatRole::LastMessageSenderId => "last_message_sender_id",
            ChatRole::LastMessageDate => "last_message_date",
            ChatRole::LastMessageText => "last_message_text",
            ChatRole::LastMessageStatus => "last_message_status",
            ChatRole::ChatMemberStatus => "chat_member_status",
            ChatRole::SecretChatState => "secret_chat_state",
            ChatRole::IsVerified => "is_verified",
            ChatRole::IsChannel => "is_channel",
            ChatRole::IsMarkedAsUnread => "is_marked_as_unread",
            ChatRole::IsPinned => "is_pinned",
            ChatRole::Filter => "filter",
            ChatRole::DraftMessageText => "draft_message_text",
            ChatRole::DraftMessageDate => "draft_message_date",
            ChatRole::ChatFolders => "chat_folders",
            ChatRole::MainFolderPosition => "main_folder_position",
        }
    }
}
