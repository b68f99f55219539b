use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::ring_buffer::RingBuffer;
use crate::error::Result;
use crate::model::{Message, Snowflake};

/// Bounded cache of recently seen messages, looked up by id.
/// Shareable across tasks behind an `Arc`.
pub struct MessageCache {
    ring: Mutex<RingBuffer<Message>>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            ring: Mutex::new(RingBuffer::new(capacity)?),
        })
    }

    fn ring(&self) -> MutexGuard<'_, RingBuffer<Message>> {
        // A panic mid-update can at worst leave one slot stale.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache a message. A newer copy of an already cached message replaces it.
    pub fn insert(&self, message: Message) {
        let mut ring = self.ring();
        ring.remove_where(|m| m.id == message.id);
        if let Some(evicted) = ring.push(message) {
            debug!(message_id = %evicted.id, "evicted message from cache");
        }
    }

    pub fn get(&self, id: Snowflake) -> Option<Message> {
        self.ring().find(|m| m.id == id).cloned()
    }

    pub fn contains(&self, id: Snowflake) -> bool {
        self.ring().contains_where(|m| m.id == id)
    }

    pub fn remove(&self, id: Snowflake) -> bool {
        self.ring().remove_where(|m| m.id == id)
    }

    /// Cached messages of one channel, oldest first.
    pub fn channel_messages(&self, channel_id: Snowflake) -> Vec<Message> {
        self.ring()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ring().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring().capacity()
    }

    pub fn clear(&self) {
        self.ring().clear();
    }
}
