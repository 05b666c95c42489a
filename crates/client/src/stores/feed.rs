//! Live feeds: REST pages merged with realtime pushes.
//!
//! A feed holds each record once, keyed by id, sorted by timestamp ascending.
//! Pages and pushes can arrive in any order and overlap.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use groupwatch_shared::{Certificate, LiveMessage, MemberEvent, Message};

/// A record that can live in a [`LiveFeed`].
pub trait FeedItem: Clone {
    type Id: Eq + Hash + Clone;

    fn id(&self) -> Self::Id;
    fn timestamp(&self) -> DateTime<Utc>;
    fn group_id(&self) -> Option<i64>;
}

/// A message stored in a feed.
/// This is a unified format that works for both REST API and WebSocket messages.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: String,
    pub group_id: Option<i64>,
    pub group_name: String,
    pub sender_name: String,
    pub sender_phone: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for StoredMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            group_id: Some(m.group_id).filter(|id| *id != 0),
            group_name: m.group_name,
            sender_name: m.sender_name,
            sender_phone: m.sender_phone,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

impl From<LiveMessage> for StoredMessage {
    fn from(m: LiveMessage) -> Self {
        Self {
            id: m.id,
            group_id: m.group_id,
            group_name: m.group_name,
            sender_name: m.sender_name,
            sender_phone: m.sender_phone,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

impl FeedItem for StoredMessage {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn group_id(&self) -> Option<i64> {
        self.group_id
    }
}

impl FeedItem for MemberEvent {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn group_id(&self) -> Option<i64> {
        Some(self.group_id)
    }
}

impl FeedItem for Certificate {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn group_id(&self) -> Option<i64> {
        Some(self.group_id)
    }
}

#[derive(Debug, Clone)]
pub struct LiveFeed<T: FeedItem> {
    items: Vec<T>,
    ids: HashSet<T::Id>,
    /// Whether a REST page has been merged yet.
    is_loaded: bool,
    /// Oldest items are dropped past this many.
    max_len: Option<usize>,
}

impl<T: FeedItem> Default for LiveFeed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            is_loaded: false,
            max_len: None,
        }
    }
}

impl<T: FeedItem> LiveFeed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    /// Add a realtime record, maintaining sort order by timestamp.
    /// Returns false if a record with the same ID already exists.
    pub fn push_live(&mut self, item: T) -> bool {
        let added = self.insert(item);
        self.enforce_max_len();
        added
    }

    /// Merge a fetched page. Marks the feed loaded; returns how many records
    /// were new.
    pub fn merge_page(&mut self, page: impl IntoIterator<Item = T>) -> usize {
        let added = page.into_iter().filter(|item| self.insert(item.clone())).count();
        self.is_loaded = true;
        self.enforce_max_len();
        added
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Newest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().rev().take(n)
    }

    pub fn in_group(&self, group_id: i64) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter(move |item| item.group_id() == Some(group_id))
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.is_loaded = false;
    }

    fn insert(&mut self, item: T) -> bool {
        if !self.ids.insert(item.id()) {
            return false;
        }

        // Find insertion point to maintain sort order; equal timestamps keep
        // arrival order.
        let ts = item.timestamp();
        let pos = self.items.partition_point(|m| m.timestamp() <= ts);
        self.items.insert(pos, item);
        true
    }

    fn enforce_max_len(&mut self) {
        let Some(max) = self.max_len else {
            return;
        };
        if self.items.len() > max {
            let excess = self.items.len() - max;
            for item in self.items.drain(..excess) {
                self.ids.remove(&item.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, minute: u32, group_id: i64) -> StoredMessage {
        StoredMessage {
            id: id.into(),
            group_id: Some(group_id),
            group_name: format!("Group {group_id}"),
            sender_name: "Wanjiru".into(),
            sender_phone: None,
            content: format!("message {id}"),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        }
    }

    fn ids(feed: &LiveFeed<StoredMessage>) -> Vec<&str> {
        feed.items().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn pushes_are_deduplicated_and_sorted() {
        let mut feed = LiveFeed::new();
        assert!(feed.push_live(msg("b", 5, 1)));
        assert!(feed.push_live(msg("a", 1, 1)));
        assert!(!feed.push_live(msg("b", 5, 1)));
        assert_eq!(ids(&feed), vec!["a", "b"]);
    }

    #[test]
    fn page_overlapping_live_pushes_merges_once() {
        let mut feed = LiveFeed::new();
        feed.push_live(msg("c", 9, 1));
        let added = feed.merge_page(vec![msg("a", 1, 1), msg("b", 3, 2), msg("c", 9, 1)]);
        assert_eq!(added, 2);
        assert!(feed.is_loaded());
        assert_eq!(ids(&feed), vec!["a", "b", "c"]);
        assert_eq!(feed.in_group(1).count(), 2);
        assert_eq!(
            feed.latest(1).map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["c"]
        );
    }

    #[test]
    fn max_len_drops_oldest() {
        let mut feed = LiveFeed::with_max_len(2);
        feed.merge_page(vec![msg("a", 1, 1), msg("b", 2, 1), msg("c", 3, 1)]);
        assert_eq!(ids(&feed), vec!["b", "c"]);
        assert!(!feed.contains(&"a".to_string()));
    }

    #[test]
    fn live_message_converts_without_group() {
        let live = LiveMessage {
            id: "m1".into(),
            group_id: None,
            group_name: "Team".into(),
            sender_name: "Ali".into(),
            sender_phone: None,
            content: "hi".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        };
        let stored = StoredMessage::from(live);
        assert_eq!(stored.group_id, None);
        assert_eq!(stored.id, "m1");
    }
}
