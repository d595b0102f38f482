//! Live, ordered, incrementally-updated view over a collection of chats
//! streamed from a messaging backend.
//!
//! The model keeps three structures consistent under a stream of partial
//! update events: an ordered sequence of visible chats (most recently
//! active first), an identity-to-position map over that sequence, and a
//! hidden set for chats excluded from the projection. Observers receive
//! minimal change notifications (affected positions and attribute roles)
//! instead of full invalidations.

pub mod context;
pub mod error;
pub mod folders;
pub mod index;
pub mod model;
pub mod types;
pub mod visibility;

pub use context::{BackendContext, GroupState};
pub use error::PayloadError;
pub use model::ChatListModel;
pub use types::chat::ChatData;
pub use types::events::{ChatUpdate, ListChange};
pub use types::{ChatId, ChatKind, ChatRole, MemberStatus, MessageStatus, SecretChatState};
