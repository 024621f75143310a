//! Bounded per-conversation history.
//!
//! Conversations live in an LRU map keyed by [`ConversationId`]. The
//! map lock is a short, non-async `parking_lot` mutex; each
//! conversation carries its own `tokio` mutex so one slow turn only
//! serializes turns for that conversation, never the whole store. The
//! inner lock is async because it is held across model round-trips.

use crate::types::{Conversation, ConversationId};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Number of conversations retained before least-recently-used
/// eviction.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 256;

/// Handle to one conversation's state.
pub type ConversationHandle = Arc<tokio::sync::Mutex<Conversation>>;

/// Keyed store of bounded conversation histories.
pub struct HistoryStore {
    conversations: Mutex<LruCache<ConversationId, ConversationHandle>>,
}

impl HistoryStore {
    /// Create a store retaining up to `max_conversations`.
    pub fn new(max_conversations: usize) -> Self {
        let cap = NonZeroUsize::new(max_conversations.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            conversations: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Look up a conversation, creating it when the id is `None` or
    /// unknown. Returns the id actually used and a handle the caller
    /// locks for the duration of the turn.
    pub fn get_or_create(
        &self,
        id: Option<ConversationId>,
    ) -> (ConversationId, ConversationHandle) {
        let mut map = self.conversations.lock();
        let id = id.unwrap_or_default();
        if let Some(handle) = map.get(&id) {
            return (id, handle.clone());
        }
        debug!(conversation_id = %id, "starting new conversation");
        let handle: ConversationHandle =
            Arc::new(tokio::sync::Mutex::new(Conversation::new(id)));
        map.put(id, handle.clone());
        (id, handle)
    }

    /// Number of conversations currently retained.
    pub fn len(&self) -> usize {
        self.conversations.lock().len()
    }

    /// True when no conversations are retained.
    pub fn is_empty(&self) -> bool {
        self.conversations.lock().is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONVERSATIONS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_llm::Message;

    #[tokio::test]
    async fn test_new_conversation_when_id_is_none() {
        let store = HistoryStore::default();
        let (id, handle) = store.get_or_create(None);
        assert!(handle.lock().await.messages.is_empty());
        assert_eq!(store.len(), 1);

        // Same id resolves to the same conversation.
        let (again, handle2) = store.get_or_create(Some(id));
        assert_eq!(id, again);
        handle.lock().await.push(Message::user("hello"));
        assert_eq!(handle2.lock().await.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_creates_fresh_conversation() {
        let store = HistoryStore::default();
        let id = ConversationId::new();
        let (returned, handle) = store.get_or_create(Some(id));
        assert_eq!(id, returned);
        assert!(handle.lock().await.messages.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let store = HistoryStore::new(2);
        let (a, _) = store.get_or_create(None);
        let (b, _) = store.get_or_create(None);
        // Touch `a` so `b` becomes least recently used.
        store.get_or_create(Some(a));
        let (_c, _) = store.get_or_create(None);

        assert_eq!(store.len(), 2);
        // `b` was evicted: looking it up creates a fresh conversation.
        let (returned, _) = store.get_or_create(Some(b));
        assert_eq!(returned, b);
    }
}
