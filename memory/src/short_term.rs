//! Per-user bounded FIFO buffer of recent utterances.
//!
//! Held only in process memory — it is never persisted, and a restart drops
//! it entirely. Each user gets their own bounded deque; once a user's deque
//! is at capacity, the oldest entry is evicted silently to make room for the
//! newest (no error, no notification).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::types::ShortTermEntry;

/// Default per-user capacity (`M` in the design notes).
pub const DEFAULT_MAX_ITEMS: usize = 32;

/// A per-user FIFO of [`ShortTermEntry`], capped at `max_items` per user.
pub struct ShortTermBuffer {
    max_items: usize,
    by_user: Mutex<HashMap<String, VecDeque<ShortTermEntry>>>,
}

impl ShortTermBuffer {
    /// Creates an empty buffer with the given per-user capacity.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            by_user: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `entry`, evicting the oldest entry for that user if at
    /// capacity.
    pub fn push(&self, entry: ShortTermEntry) {
        let mut by_user = self.by_user.lock();
        let deque = by_user.entry(entry.user_id.clone()).or_default();
        if deque.len() >= self.max_items {
            deque.pop_front();
        }
        deque.push_back(entry);
    }

    /// The `n` most recent entries for `user_id`, newest first. Empty if the
    /// user has no entries yet.
    #[must_use]
    pub fn recent(&self, user_id: &str, n: usize) -> Vec<ShortTermEntry> {
        let by_user = self.by_user.lock();
        let Some(deque) = by_user.get(user_id) else {
            return Vec::new();
        };
        deque.iter().rev().take(n).cloned().collect()
    }

    /// Drops every user's buffer.
    pub fn clear_all(&self) {
        self.by_user.lock().clear();
    }
}

impl Default for ShortTermBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn entry(user_id: &str, text: &str) -> ShortTermEntry {
        ShortTermEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            embedding: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn recent_returns_newest_first() {
        let buf = ShortTermBuffer::new(32);
        buf.push(entry("u1", "first"));
        buf.push(entry("u1", "second"));

        let recent = buf.recent("u1", 5);
        assert_eq!(recent[0].text, "second");
        assert_eq!(recent[1].text, "first");
    }

    #[test]
    fn eviction_drops_oldest_silently() {
        let buf = ShortTermBuffer::new(2);
        buf.push(entry("u1", "a"));
        buf.push(entry("u1", "b"));
        buf.push(entry("u1", "c"));

        let recent = buf.recent("u1", 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "c");
        assert_eq!(recent[1].text, "b");
    }

    #[test]
    fn users_are_isolated() {
        let buf = ShortTermBuffer::new(32);
        buf.push(entry("u1", "a"));
        assert!(buf.recent("u2", 10).is_empty());
    }

    #[test]
    fn unknown_user_returns_empty() {
        let buf = ShortTermBuffer::default();
        assert!(buf.recent("ghost", 5).is_empty());
    }

    #[test]
    fn clear_all_drops_every_user() {
        let buf = ShortTermBuffer::new(32);
        buf.push(entry("u1", "a"));
        buf.push(entry("u2", "b"));
        buf.clear_all();
        assert!(buf.recent("u1", 5).is_empty());
        assert!(buf.recent("u2", 5).is_empty());
    }
}
