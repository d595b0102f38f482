//! The chat list model: consumes typed update events from the backend,
//! routes them to the entity, ordered index and hidden set, and emits
//! minimal change notifications over a broadcast channel.
//!
//! All mutation happens on one logical thread; every event is processed to
//! completion, and notifications go out only once the structure is
//! consistent again.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, info};
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use crate::context::{BackendContext, GroupState};
use crate::folders::FolderProjection;
use crate::index::OrderedIndex;
use crate::types::chat::{ChatData, as_i64};
use crate::types::events::{ChatUpdate, ListChange};
use crate::types::{ChatId, ChatKind, ChatRole, SecretChatState};

/// Buffer size of the outbound notification channel.
const CHANNEL_CAPACITY: usize = 100;

/// Cadence of the relative-time refresh broadcast.
const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub struct ChatListModel {
    ctx: Arc<dyn BackendContext>,
    index: OrderedIndex,
    hidden: HashMap<ChatId, ChatData>,
    folders: FolderProjection,
    show_all: bool,
    changes: broadcast::Sender<ListChange>,
    /// Mirror of the visible count for the refresh task.
    visible_len: Arc<AtomicUsize>,
    refresh_task: Option<tokio::task::JoinHandle<()>>,
}

impl ChatListModel {
    pub fn new(ctx: Arc<dyn BackendContext>) -> Self {
        Self {
            ctx,
            index: OrderedIndex::new(),
            hidden: HashMap::new(),
            folders: FolderProjection::new(),
            show_all: false,
            changes: broadcast::channel(CHANNEL_CAPACITY).0,
            visible_len: Arc::new(AtomicUsize::new(0)),
            refresh_task: None,
        }
    }

    /// Subscribe to change notifications. Only changes to the visible
    /// projection are broadcast; hidden chats mutate silently.
    pub fn subscribe(&self) -> broadcast::Receiver<ListChange> {
        self.changes.subscribe()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn chat_at(&self, position: usize) -> Option<&ChatData> {
        self.index.get(position)
    }

    pub fn position_of(&self, chat_id: ChatId) -> Option<usize> {
        self.index.position_of(chat_id)
    }

    /// Full attribute snapshot of the chat at `position`, keyed by role
    /// name.
    pub fn get(&self, position: usize) -> Option<Value> {
        let chat = self.index.get(position)?;
        let own_user_id = self.ctx.own_user_id();
        let mut map = Map::new();
        for role in ChatRole::ALL {
            let value = match role {
                ChatRole::ChatFolders => json!(self.folders.titles()),
                ChatRole::MainFolderPosition => json!(self.folders.main_position()),
                _ => chat.role_value(role, own_user_id),
            };
            map.insert(role.name().to_string(), value);
        }
        Some(Value::Object(map))
    }

    /// Raw state of a visible chat; hidden chats are not part of the
    /// observable projection.
    pub fn get_by_id(&self, chat_id: ChatId) -> Option<Value> {
        let position = self.index.position_of(chat_id)?;
        self.index.get(position).map(ChatData::raw_state)
    }

    pub fn folders(&self) -> &FolderProjection {
        &self.folders
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    /// Toggle the override that surfaces hidden chats. Re-evaluates the
    /// whole population, which is acceptable for a user-initiated action.
    pub fn set_show_all(&mut self, show_all: bool) {
        if self.show_all == show_all {
            return;
        }
        self.show_all = show_all;
        self.update_chat_visibility(None);
        self.emit(ListChange::ShowAllChanged { show_all });
    }

    /// Drop every chat, visible and hidden.
    pub fn reset(&mut self) {
        info!("Resetting chat list model");
        self.index.clear();
        self.hidden.clear();
        self.sync_visible_len();
        self.emit(ListChange::Reset);
    }

    /// Sum unread messages over the visible chats and count the chats that
    /// have any; also broadcast the result.
    pub fn compute_unread_state(&self) -> (i32, i32) {
        let mut unread_messages = 0;
        let mut unread_chats = 0;
        for chat in self.index.chats() {
            if chat.unread_count > 0 {
                unread_chats += 1;
                unread_messages += chat.unread_count;
            }
        }
        debug!("New unread state: {unread_messages} messages in {unread_chats} chats");
        self.emit(ListChange::UnreadState {
            unread_messages,
            unread_chats,
        });
        (unread_messages, unread_chats)
    }

    /// Deep copy of the whole model: independent entities, a freshly built
    /// index, its own notification channel, and no running refresh task.
    pub fn snapshot(&self) -> ChatListModel {
        ChatListModel {
            ctx: self.ctx.clone(),
            index: OrderedIndex::from_sorted(self.index.chats().to_vec()),
            hidden: self.hidden.clone(),
            folders: self.folders.clone(),
            show_all: self.show_all,
            changes: broadcast::channel(CHANNEL_CAPACITY).0,
            visible_len: Arc::new(AtomicUsize::new(self.index.len())),
            refresh_task: None,
        }
    }

    /// Apply one update event. Events referencing unknown chats are
    /// dropped silently; they are a normal race between the discovery
    /// stream and the other update streams.
    pub fn apply(&mut self, update: ChatUpdate) {
        match update {
            ChatUpdate::Discovered { chat } => self.handle_discovered(chat),
            ChatUpdate::LastMessage {
                chat_id,
                order,
                message,
            } => self.handle_last_message(chat_id, &order, message),
            ChatUpdate::Order { chat_id, order } => self.handle_order(chat_id, &order),
            ChatUpdate::ReadInbox {
                chat_id,
                last_read_inbox_message_id,
                unread_count,
            } => self.handle_read_inbox(chat_id, last_read_inbox_message_id, unread_count),
            ChatUpdate::ReadOutbox {
                chat_id,
                last_read_outbox_message_id,
            } => {
                debug!("Updating last read outbox message for chat {chat_id}");
                // The read marker shifts the delivery status of an unknown
                // span of own messages; observers re-read every role.
                self.update_chat(chat_id, Some(Vec::new()), |chat| {
                    chat.set_last_read_outbox(last_read_outbox_message_id);
                });
            }
            ChatUpdate::Photo { chat_id, photo } => {
                debug!("Updating photo for chat {chat_id}");
                self.update_chat(chat_id, Some(vec![ChatRole::PhotoSmall]), |chat| {
                    chat.set_photo(photo);
                });
            }
            ChatUpdate::PinnedMessage {
                chat_id,
                pinned_message_id,
            } => {
                debug!("Updating pinned message for chat {chat_id}");
                self.update_chat(chat_id, None, |chat| {
                    chat.set_pinned_message(pinned_message_id);
                });
            }
            ChatUpdate::MessageSendSucceeded {
                message_id,
                old_message_id,
                message,
            } => self.handle_message_send_succeeded(message_id, old_message_id, message),
            ChatUpdate::NotificationSettings { chat_id, settings } => {
                debug!("Updating notification settings for chat {chat_id}");
                self.update_chat(chat_id, Some(Vec::new()), |chat| {
                    chat.set_notification_settings(settings);
                });
            }
            ChatUpdate::GroupUpdated { group_id } => {
                let group = self.ctx.group(group_id);
                debug!("Group {group_id} updated, re-evaluating visibility");
                self.update_chat_visibility(group.as_ref());
            }
            ChatUpdate::SecretChat {
                secret_chat_id,
                state,
            } => self.handle_secret_chat(secret_chat_id, state),
            ChatUpdate::Title { chat_id, title } => {
                debug!("Updating title for chat {chat_id}");
                self.update_chat(
                    chat_id,
                    Some(vec![ChatRole::Title, ChatRole::Filter]),
                    |chat| chat.set_title(title),
                );
            }
            ChatUpdate::Pinned { chat_id, is_pinned } => {
                debug!("Updating pinned flag for chat {chat_id}: {is_pinned}");
                self.update_chat(chat_id, Some(vec![ChatRole::IsPinned]), |chat| {
                    chat.set_pinned(is_pinned);
                });
            }
            ChatUpdate::MarkedAsUnread {
                chat_id,
                is_marked_as_unread,
            } => {
                debug!("Updating marked-as-unread flag for chat {chat_id}: {is_marked_as_unread}");
                self.update_chat(chat_id, Some(vec![ChatRole::IsMarkedAsUnread]), |chat| {
                    chat.set_marked_as_unread(is_marked_as_unread);
                });
            }
            ChatUpdate::Draft {
                chat_id,
                draft,
                order,
            } => self.handle_draft(chat_id, draft, &order),
            ChatUpdate::UnreadMentionCount { chat_id, count } => {
                debug!("Updating mention count for chat {chat_id}: {count}");
                self.update_chat(chat_id, Some(vec![ChatRole::UnreadMentionCount]), |chat| {
                    chat.set_unread_mention_count(count);
                });
            }
            ChatUpdate::UnreadReactionCount { chat_id, count } => {
                debug!("Updating reaction count for chat {chat_id}: {count}");
                self.update_chat(chat_id, Some(vec![ChatRole::UnreadReactionCount]), |chat| {
                    chat.set_unread_reaction_count(count);
                });
            }
            ChatUpdate::AvailableReactions { chat_id, reactions } => {
                debug!("Updating available reactions for chat {chat_id}");
                self.update_chat(chat_id, Some(vec![ChatRole::AvailableReactions]), |chat| {
                    chat.set_available_reactions(reactions);
                });
            }
            ChatUpdate::Folders {
                folders,
                main_position,
            } => {
                self.folders.set_folders(&folders, main_position);
                self.emit(ListChange::FoldersChanged);
            }
            ChatUpdate::FolderInfo { info } => {
                self.folders.set_folder_info(info);
                self.emit(ListChange::FoldersChanged);
            }
        }
    }

    fn handle_discovered(&mut self, chat: Value) {
        let mut chat = match ChatData::from_raw(chat, self.ctx.as_ref()) {
            Ok(chat) => chat,
            Err(e) => {
                debug!("Dropping chat discovery: {e}");
                return;
            }
        };
        if self.index.contains(chat.chat_id) || self.hidden.contains_key(&chat.chat_id) {
            debug!("Chat {} already known, ignoring rediscovery", chat.chat_id);
            return;
        }
        if chat.group_id != 0
            && let Some(group) = self.ctx.group(chat.group_id)
        {
            chat.apply_group(&group);
        }
        if chat.kind == ChatKind::Secret
            && let Some(state) = self.ctx.secret_chat_state(chat.secret_chat_id)
        {
            chat.apply_secret_chat_state(state);
        }
        if chat.is_hidden() && !self.show_all {
            debug!("Discovered hidden chat {}", chat.chat_id);
            self.hidden.insert(chat.chat_id, chat);
        } else {
            debug!("Discovered visible chat {}", chat.chat_id);
            self.add_visible(chat);
        }
    }

    fn handle_last_message(&mut self, chat_id: ChatId, order: &str, message: Value) {
        if let Some(position) = self.index.position_of(chat_id) {
            debug!("Updating last message for chat {chat_id} at {position}, new order {order:?}");
            let order_changed = match self.index.get_mut(position) {
                Some(chat) => chat.set_order(order),
                None => return,
            };
            let mut position = position;
            if order_changed
                && let Some((from, target)) = self.index.reorder(chat_id)
            {
                position = target;
                self.emit_moved(from, target);
            }
            let Some(chat) = self.index.get_mut(position) else {
                return;
            };
            let roles = chat.apply_last_message(message, self.ctx.as_ref());
            self.emit(ListChange::Changed { at: position, roles });
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            debug!("Updating last message for hidden chat {chat_id}, new order {order:?}");
            chat.set_order(order);
            chat.apply_last_message(message, self.ctx.as_ref());
            // A chat can become visible here, e.g. a private chat that was
            // discovered before it had any messages.
            if !chat.is_hidden() || self.show_all {
                if let Some(chat) = self.hidden.remove(&chat_id) {
                    self.add_visible(chat);
                }
            }
        } else {
            debug!("Ignoring last message for unknown chat {chat_id}");
        }
    }

    fn handle_order(&mut self, chat_id: ChatId, order: &str) {
        if let Some(position) = self.index.position_of(chat_id) {
            debug!("Updating chat order of {chat_id} to {order:?}");
            let changed = match self.index.get_mut(position) {
                Some(chat) => chat.set_order(order),
                None => false,
            };
            if changed
                && let Some((from, target)) = self.index.reorder(chat_id)
            {
                self.emit_moved(from, target);
            }
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            debug!("Updating order of hidden chat {chat_id} to {order:?}");
            chat.set_order(order);
        } else {
            debug!("Ignoring order update for unknown chat {chat_id}");
        }
    }

    fn handle_read_inbox(&mut self, chat_id: ChatId, message_id: i64, unread_count: i32) {
        if let Some(position) = self.index.position_of(chat_id) {
            debug!("Updating unread count for chat {chat_id}: {unread_count}");
            let mut roles = vec![ChatRole::Display];
            if let Some(chat) = self.index.get_mut(position) {
                if chat.apply_unread_count(unread_count) {
                    roles.push(ChatRole::UnreadCount);
                }
                if chat.apply_last_read_inbox(message_id) {
                    roles.push(ChatRole::LastReadInboxMessageId);
                }
            }
            self.emit(ListChange::Changed { at: position, roles });
            self.compute_unread_state();
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            debug!("Updating unread count for hidden chat {chat_id}: {unread_count}");
            chat.apply_unread_count(unread_count);
            chat.apply_last_read_inbox(message_id);
        } else {
            debug!("Ignoring read inbox update for unknown chat {chat_id}");
        }
    }

    fn handle_message_send_succeeded(
        &mut self,
        message_id: i64,
        old_message_id: i64,
        message: Value,
    ) {
        let Some(chat_id) = message.get("chat_id").and_then(as_i64) else {
            debug!("Dropping send-succeeded event without chat id");
            return;
        };
        debug!(
            "Message sent in chat {chat_id}, old id {old_message_id}, new id {message_id}"
        );
        if let Some(position) = self.index.position_of(chat_id) {
            let Some(chat) = self.index.get_mut(position) else {
                return;
            };
            let roles = chat.apply_last_message(message, self.ctx.as_ref());
            self.emit(ListChange::Changed { at: position, roles });
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            chat.apply_last_message(message, self.ctx.as_ref());
            if !chat.is_hidden() || self.show_all {
                if let Some(chat) = self.hidden.remove(&chat_id) {
                    self.add_visible(chat);
                }
            }
        } else {
            debug!("Ignoring sent message for unknown chat {chat_id}");
        }
    }

    fn handle_draft(&mut self, chat_id: ChatId, draft: Value, order: &str) {
        if let Some(position) = self.index.position_of(chat_id) {
            debug!("Updating draft message for chat {chat_id}");
            if let Some(chat) = self.index.get_mut(position) {
                chat.set_draft(draft);
            }
            self.emit(ListChange::Changed {
                at: position,
                roles: vec![ChatRole::DraftMessageDate, ChatRole::DraftMessageText],
            });
            let order_changed = match self.index.get_mut(position) {
                Some(chat) => chat.set_order(order),
                None => false,
            };
            if order_changed
                && let Some((from, target)) = self.index.reorder(chat_id)
            {
                self.emit_moved(from, target);
            }
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            debug!("Updating draft message for hidden chat {chat_id}");
            chat.set_draft(draft);
            chat.set_order(order);
        } else {
            debug!("Ignoring draft update for unknown chat {chat_id}");
        }
    }

    fn handle_secret_chat(&mut self, secret_chat_id: i64, state: SecretChatState) {
        debug!("Updating secret chat {secret_chat_id} to {state:?}");
        let mut i = 0;
        while i < self.index.len() {
            let evaluated = match self.index.get_mut(i) {
                Some(chat)
                    if chat.kind == ChatKind::Secret && chat.secret_chat_id == secret_chat_id =>
                {
                    let changed = chat.apply_secret_chat_state(state);
                    Some((changed, chat.is_hidden()))
                }
                Some(_) => None,
                None => break,
            };
            match evaluated {
                Some((_, true)) if !self.show_all => self.demote_at(i),
                Some((changed, _)) => {
                    if !changed.is_empty() {
                        self.emit(ListChange::Changed {
                            at: i,
                            roles: changed,
                        });
                    }
                    i += 1;
                }
                None => i += 1,
            }
        }

        let candidates: Vec<ChatId> = self
            .hidden
            .iter()
            .filter(|(_, chat)| {
                chat.kind == ChatKind::Secret && chat.secret_chat_id == secret_chat_id
            })
            .map(|(chat_id, _)| *chat_id)
            .collect();
        for chat_id in candidates {
            let promote = match self.hidden.get_mut(&chat_id) {
                Some(chat) => {
                    chat.apply_secret_chat_state(state);
                    !chat.is_hidden() || self.show_all
                }
                None => false,
            };
            if promote && let Some(chat) = self.hidden.remove(&chat_id) {
                self.add_visible(chat);
            }
        }
    }

    /// Re-evaluate visibility over the whole population, applying `group`
    /// to every chat that references it on the way. Runs on group updates
    /// and on show-all toggles; a full scan by design, both triggers are
    /// rare relative to the event stream.
    fn update_chat_visibility(&mut self, group: Option<&GroupState>) {
        let mut i = 0;
        while i < self.index.len() {
            let (changed, hidden) = match self.index.get_mut(i) {
                Some(chat) => {
                    let changed = group.map(|g| chat.apply_group(g)).unwrap_or_default();
                    (changed, chat.is_hidden())
                }
                None => break,
            };
            if hidden && !self.show_all {
                self.demote_at(i);
            } else {
                if !changed.is_empty() {
                    self.emit(ListChange::Changed {
                        at: i,
                        roles: changed,
                    });
                }
                i += 1;
            }
        }

        let candidates: Vec<ChatId> = self.hidden.keys().copied().collect();
        for chat_id in candidates {
            let promote = match self.hidden.get_mut(&chat_id) {
                Some(chat) => {
                    if let Some(g) = group {
                        chat.apply_group(g);
                    }
                    !chat.is_hidden() || self.show_all
                }
                None => false,
            };
            if promote && let Some(chat) = self.hidden.remove(&chat_id) {
                self.add_visible(chat);
            }
        }
    }

    /// Visible-or-hidden attribute update: visible chats get a change
    /// notification with `roles` (`None` means the mutation is not
    /// observable at all), hidden chats mutate silently.
    fn update_chat<F>(&mut self, chat_id: ChatId, roles: Option<Vec<ChatRole>>, mutate: F)
    where
        F: FnOnce(&mut ChatData),
    {
        if let Some(position) = self.index.position_of(chat_id) {
            if let Some(chat) = self.index.get_mut(position) {
                mutate(chat);
            }
            if let Some(roles) = roles {
                self.emit(ListChange::Changed {
                    at: position,
                    roles,
                });
            }
        } else if let Some(chat) = self.hidden.get_mut(&chat_id) {
            mutate(chat);
        } else {
            debug!("Ignoring update for unknown chat {chat_id}");
        }
    }

    fn add_visible(&mut self, chat: ChatData) {
        let chat_id = chat.chat_id;
        let at = self.index.insert(chat);
        self.sync_visible_len();
        debug!("Adding chat {chat_id} at {at}");
        self.emit(ListChange::Inserted { at });
        self.enable_refresh_timer();
    }

    fn demote_at(&mut self, at: usize) {
        if let Some(chat) = self.index.remove_at(at) {
            debug!("Hiding chat {} at {at}", chat.chat_id);
            self.hidden.insert(chat.chat_id, chat);
            self.sync_visible_len();
            self.emit(ListChange::Removed { at });
        }
    }

    fn emit(&self, change: ListChange) {
        let _ = self.changes.send(change);
    }

    fn emit_moved(&self, from: usize, target: usize) {
        // Insert-after semantics when moving toward the end of the list.
        let to = if target < from { target } else { target + 1 };
        self.emit(ListChange::Moved { from, to });
    }

    fn sync_visible_len(&self) {
        self.visible_len.store(self.index.len(), Ordering::Relaxed);
    }

    /// Start the relative-time refresh broadcast the first time a chat
    /// becomes visible. Never stopped afterwards; the idle cost is
    /// accepted. A no-op outside a tokio runtime.
    fn enable_refresh_timer(&mut self) {
        if self.refresh_task.is_some() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        debug!("Enabling refresh timer");
        let changes = self.changes.clone();
        let visible_len = self.visible_len.clone();
        self.refresh_task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            // The first tick fires immediately; the insertion notification
            // already covers that instant.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let len = visible_len.load(Ordering::Relaxed);
                if len > 0 {
                    let _ = changes.send(ListChange::RangeChanged {
                        first: 0,
                        last: len - 1,
                        roles: vec![ChatRole::LastMessageDate, ChatRole::LastMessageStatus],
                    });
                }
            }
        }));
    }
}

impl Drop for ChatListModel {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}
