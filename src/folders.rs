//! Folder projection: a read-only mapping from folder ids to titles,
//! replaced wholesale on refresh. Layered on top of the chat list without
//! affecting ordering or visibility.

use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::types::chat::as_i64;

/// Pseudo-folders always present ahead of the backend-supplied ones.
const BUILTIN_FOLDERS: [(i64, &str); 3] = [
    (-1, "All Chats"),
    (-2, "Chats only"),
    (-3, "Channels only"),
];

#[derive(Debug, Clone, Default)]
pub struct FolderProjection {
    titles: Vec<String>,
    by_id: HashMap<i64, String>,
    details: HashMap<String, Value>,
    main_position: i64,
}

impl FolderProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the folder list with a fresh backend snapshot.
    pub fn set_folders(&mut self, folders: &[Value], main_position: i64) {
        debug!(
            "Updating {} chat folders, main list position {main_position}",
            folders.len()
        );
        self.titles.clear();
        self.by_id.clear();
        self.main_position = main_position;

        for (id, title) in BUILTIN_FOLDERS {
            self.titles.push(title.to_string());
            self.by_id.insert(id, title.to_string());
        }
        for folder in folders {
            let Some(id) = folder.get("id").and_then(as_i64) else {
                continue;
            };
            let title = folder
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            self.titles.push(title.clone());
            self.by_id.insert(id, title);
        }
    }

    /// Store detailed folder information, keyed by title; replaces any
    /// previous detail under the same title.
    pub fn set_folder_info(&mut self, info: Value) {
        let Some(title) = info.get("title").and_then(Value::as_str) else {
            return;
        };
        let title = title.to_string();
        self.details.insert(title, info);
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn title_of(&self, folder_id: i64) -> Option<&str> {
        self.by_id.get(&folder_id).map(String::as_str)
    }

    pub fn detail(&self, title: &str) -> Option<&Value> {
        self.details.get(title)
    }

    pub fn main_position(&self) -> i64 {
        self.main_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_precede_backend_folders() {
        let mut folders = FolderProjection::new();
        folders.set_folders(
            &[
                json!({"id": 10, "title": "Work"}),
                json!({"id": 11, "title": "Family"}),
            ],
            2,
        );
        assert_eq!(
            folders.titles(),
            ["All Chats", "Chats only", "Channels only", "Work", "Family"]
        );
        assert_eq!(folders.title_of(-1), Some("All Chats"));
        assert_eq!(folders.title_of(10), Some("Work"));
        assert_eq!(folders.main_position(), 2);
    }

    #[test]
    fn test_refresh_replaces_wholesale() {
        let mut folders = FolderProjection::new();
        folders.set_folders(&[json!({"id": 10, "title": "Work"})], 0);
        folders.set_folders(&[json!({"id": 12, "title": "News"})], 1);
        assert_eq!(folders.title_of(10), None);
        assert_eq!(folders.title_of(12), Some("News"));
    }

    #[test]
    fn test_folder_info_keyed_by_title() {
        let mut folders = FolderProjection::new();
        folders.set_folder_info(json!({"title": "Work", "included_chat_ids": [1, 2]}));
        folders.set_folder_info(json!({"title": "Work", "included_chat_ids": [3]}));
        assert_eq!(
            folders.detail("Work").and_then(|d| d.get("included_chat_ids")),
            Some(&json!([3]))
        );
        assert_eq!(folders.detail("News"), None);
    }

    #[test]
    fn test_malformed_folder_entries_are_skipped() {
        let mut folders = FolderProjection::new();
        folders.set_folders(&[json!({"title": "No id"}), json!("garbage")], 0);
        assert_eq!(folders.titles().len(), 3);
    }
}
