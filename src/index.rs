//! The ordered index over visible chats: a sequence sorted by the entity
//! comparator plus an identity-to-position map that is kept correct by
//! rewriting only the disturbed sub-range on every structural change.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::types::ChatId;
use crate::types::chat::ChatData;

#[derive(Debug, Default)]
pub struct OrderedIndex {
    chats: Vec<ChatData>,
    positions: HashMap<ChatId, usize>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from an already-sorted sequence, for snapshotting.
    pub(crate) fn from_sorted(chats: Vec<ChatData>) -> Self {
        let positions = chats
            .iter()
            .enumerate()
            .map(|(position, chat)| (chat.chat_id, position))
            .collect();
        let index = Self { chats, positions };
        index.assert_consistent();
        index
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn chats(&self) -> &[ChatData] {
        &self.chats
    }

    pub fn get(&self, position: usize) -> Option<&ChatData> {
        self.chats.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut ChatData> {
        self.chats.get_mut(position)
    }

    pub fn position_of(&self, chat_id: ChatId) -> Option<usize> {
        self.positions.get(&chat_id).copied()
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.positions.contains_key(&chat_id)
    }

    /// Splice a chat in at its rank and return the insertion position.
    /// Only map entries at or after that position are rewritten.
    pub fn insert(&mut self, chat: ChatData) -> usize {
        let position = self
            .chats
            .iter()
            .position(|existing| chat.sort_cmp(existing) == Ordering::Less)
            .unwrap_or(self.chats.len());
        self.positions.insert(chat.chat_id, position);
        self.chats.insert(position, chat);
        for i in position + 1..self.chats.len() {
            self.positions.insert(self.chats[i].chat_id, i);
        }
        self.assert_consistent();
        position
    }

    /// Excise the chat at `position`, rewriting the map for everything that
    /// shifted down.
    pub fn remove_at(&mut self, position: usize) -> Option<ChatData> {
        if position >= self.chats.len() {
            return None;
        }
        let chat = self.chats.remove(position);
        self.positions.remove(&chat.chat_id);
        for i in position..self.chats.len() {
            self.positions.insert(self.chats[i].chat_id, i);
        }
        self.assert_consistent();
        Some(chat)
    }

    pub fn remove(&mut self, chat_id: ChatId) -> Option<(usize, ChatData)> {
        let position = self.position_of(chat_id)?;
        let chat = self.remove_at(position)?;
        Some((position, chat))
    }

    /// Relocate a chat after its order key changed, moving it only as far
    /// as its neighbors require: probe backward first, forward only if no
    /// backward movement happened. Returns `(from, to)` when the chat
    /// moved; `None` when it was already correctly placed (no map rewrite,
    /// no notification needed).
    pub fn reorder(&mut self, chat_id: ChatId) -> Option<(usize, usize)> {
        let position = self.position_of(chat_id)?;
        let n = self.chats.len();
        let mut target = position;
        while target > 0
            && self.chats[position].sort_cmp(&self.chats[target - 1]) == Ordering::Less
        {
            target -= 1;
        }
        if target == position {
            while target < n - 1
                && self.chats[position].sort_cmp(&self.chats[target + 1]) == Ordering::Greater
            {
                target += 1;
            }
        }
        if target == position {
            debug!("Chat {chat_id} stays at position {position}");
            return None;
        }
        debug!("Moving chat {chat_id} from position {position} to {target}");
        let chat = self.chats.remove(position);
        self.chats.insert(target, chat);
        // Rewrite only the damaged part of the map.
        let (first, last) = if target < position {
            (target, position)
        } else {
            (position, target)
        };
        for i in first..=last {
            self.positions.insert(self.chats[i].chat_id, i);
        }
        self.assert_consistent();
        Some((position, target))
    }

    pub fn clear(&mut self) {
        self.chats.clear();
        self.positions.clear();
    }

    /// Map/sequence agreement is a structural invariant; disagreement is a
    /// programming error, so it is only checked in debug builds.
    fn assert_consistent(&self) {
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(self.chats.len(), self.positions.len());
            for (position, chat) in self.chats.iter().enumerate() {
                debug_assert_eq!(self.positions.get(&chat.chat_id), Some(&position));
                if position > 0 {
                    debug_assert_eq!(
                        self.chats[position - 1].sort_cmp(chat),
                        Ordering::Less,
                        "sequence out of order at {position}"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BackendContext, GroupState};
    use crate::types::SecretChatState;
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

    fn chat(chat_id: i64, order: i64) -> ChatData {
        ChatData::from_raw(
            json!({
                "id": chat_id,
                "order": order.to_string(),
                "type": {"@type": "chatTypePrivate", "user_id": chat_id},
                "last_message": {"id": 1, "date": 100},
            }),
            &NullBackend,
        )
        .expect("valid payload")
    }

    fn ids(index: &OrderedIndex) -> Vec<i64> {
        index.chats().iter().map(|c| c.chat_id).collect()
    }

    fn assert_positions(index: &OrderedIndex) {
        for (position, c) in index.chats().iter().enumerate() {
            assert_eq!(index.position_of(c.chat_id), Some(position));
        }
    }

    #[test]
    fn test_insert_keeps_descending_order() {
        let mut index = OrderedIndex::new();
        assert_eq!(index.insert(chat(1, 100)), 0);
        assert_eq!(index.insert(chat(2, 300)), 0);
        assert_eq!(index.insert(chat(3, 200)), 1);
        assert_eq!(ids(&index), vec![2, 3, 1]);
        assert_positions(&index);
    }

    #[test]
    fn test_insert_tie_break_puts_higher_id_first() {
        let mut index = OrderedIndex::new();
        index.insert(chat(100, 50));
        index.insert(chat(200, 50));
        assert_eq!(ids(&index), vec![200, 100]);

        let mut reversed = OrderedIndex::new();
        reversed.insert(chat(200, 50));
        reversed.insert(chat(100, 50));
        assert_eq!(ids(&reversed), vec![200, 100]);
    }

    #[test]
    fn test_remove_rewrites_tail_of_map() {
        let mut index = OrderedIndex::new();
        for (id, order) in [(1, 400), (2, 300), (3, 200), (4, 100)] {
            index.insert(chat(id, order));
        }
        let (position, removed) = index.remove(2).expect("chat 2 is present");
        assert_eq!(position, 1);
        assert_eq!(removed.chat_id, 2);
        assert_eq!(ids(&index), vec![1, 3, 4]);
        assert_positions(&index);
        assert_eq!(index.position_of(2), None);
    }

    #[test]
    fn test_reorder_moves_backward_to_front() {
        let mut index = OrderedIndex::new();
        for (id, order) in [(1, 400), (2, 300), (3, 200), (4, 100)] {
            index.insert(chat(id, order));
        }
        index
            .get_mut(index.position_of(4).unwrap())
            .unwrap()
            .set_order("500");
        assert_eq!(index.reorder(4), Some((3, 0)));
        assert_eq!(ids(&index), vec![4, 1, 2, 3]);
        assert_positions(&index);
    }

    #[test]
    fn test_reorder_moves_forward() {
        let mut index = OrderedIndex::new();
        for (id, order) in [(1, 400), (2, 300), (3, 200), (4, 100)] {
            index.insert(chat(id, order));
        }
        index
            .get_mut(index.position_of(1).unwrap())
            .unwrap()
            .set_order("150");
        assert_eq!(index.reorder(1), Some((0, 2)));
        assert_eq!(ids(&index), vec![2, 3, 1, 4]);
        assert_positions(&index);
    }

    #[test]
    fn test_reorder_disturbs_only_the_sub_range_between_old_and_new() {
        let mut index = OrderedIndex::new();
        for id in 1..=10 {
            index.insert(chat(id, 1100 - id * 100));
        }
        assert_eq!(ids(&index), (1..=10).collect::<Vec<_>>());
        let before: Vec<(i64, usize)> = index
            .chats()
            .iter()
            .enumerate()
            .map(|(position, c)| (c.chat_id, position))
            .collect();

        // Chat 8 climbs from position 7 to position 2, between chats 2 and 3.
        index.get_mut(7).unwrap().set_order("850");
        assert_eq!(index.reorder(8), Some((7, 2)));
        assert_eq!(ids(&index), vec![1, 2, 8, 3, 4, 5, 6, 7, 9, 10]);
        for (chat_id, position) in &before {
            if !(2..=7).contains(position) {
                assert_eq!(index.position_of(*chat_id), Some(*position));
            }
        }
        assert_positions(&index);

        // Chat 2 drops from position 1 to position 8; the endpoints stay put.
        index.get_mut(1).unwrap().set_order("150");
        assert_eq!(index.reorder(2), Some((1, 8)));
        assert_eq!(ids(&index), vec![1, 8, 3, 4, 5, 6, 7, 9, 2, 10]);
        assert_eq!(index.position_of(1), Some(0));
        assert_eq!(index.position_of(10), Some(9));
        assert_positions(&index);
    }

    #[test]
    fn test_reorder_in_place_is_a_noop() {
        let mut index = OrderedIndex::new();
        for (id, order) in [(1, 400), (2, 300), (3, 200)] {
            index.insert(chat(id, order));
        }
        // Still between its neighbors after the change.
        index
            .get_mut(index.position_of(2).unwrap())
            .unwrap()
            .set_order("350");
        assert_eq!(index.reorder(2), None);
        assert_eq!(ids(&index), vec![1, 2, 3]);
        assert_positions(&index);
    }

    #[test]
    fn test_reorder_single_element_never_moves() {
        let mut index = OrderedIndex::new();
        index.insert(chat(1, 100));
        index.get_mut(0).unwrap().set_order("9999");
        assert_eq!(index.reorder(1), None);
    }

    #[test]
    fn test_reorder_unknown_id_is_none() {
        let mut index = OrderedIndex::new();
        index.insert(chat(1, 100));
        assert_eq!(index.reorder(99), None);
    }
}
